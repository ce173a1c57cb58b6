//! Hardware coefficient source.
//!
//! This module reads and rewrites the coefficients stored in the Verilog source
//! of the folded FIR filter. The coefficients are given by lines such as
//!
//! ```text
//! assign coefficients[3] = 16'h002C;
//! ```
//!
//! Each line is tokenized according to the grammar
//! `assign <array>[<index>] = <bits>'h<digits>; <anything>`, with optional
//! whitespace between tokens. All other lines are opaque and are never
//! modified. Lines that start as an assignment to the coefficient array but do
//! not follow the grammar (for instance, a literal of the wrong width) are
//! also left untouched and reported as a [`Diagnostic::Skipped`].

use crate::{
    artifact,
    error::Result,
    format::FixedPointFormat,
    hex,
    quantize::QuantizedCoefficient,
    Diagnostic,
};
use std::ops::Range;
use std::path::Path;

/// Coefficient assignment found in a hardware source.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentLine {
    /// Index of the coefficient in the array.
    pub index: usize,
    /// Hexadecimal literal, as written in the source.
    pub hex_text: String,
    /// Line number (0-based).
    pub line_position: usize,
    /// Decoded coefficient.
    pub coefficient: QuantizedCoefficient,
}

/// Coefficients extracted from a hardware source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    /// Coefficient assignments, in file order.
    pub assignments: Vec<AssignmentLine>,
    /// Lines that were skipped.
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    /// Gives the raw fixed-point integers, in file order.
    pub fn raw(&self) -> Vec<i32> {
        self.assignments.iter().map(|a| a.coefficient.raw()).collect()
    }

    /// Gives the real values of the coefficients, in file order.
    pub fn coefficients(&self) -> Vec<f64> {
        self.assignments
            .iter()
            .map(|a| a.coefficient.reconstructed())
            .collect()
    }
}

/// Rewritten hardware source.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    /// Full rewritten text.
    pub text: String,
    /// Number of coefficient assignments found.
    pub matched: usize,
    /// Number of coefficient assignments that were given a new value.
    pub updated: usize,
    /// Lines that were skipped and new coefficients that were saturated.
    pub diagnostics: Vec<Diagnostic>,
}

impl Rewrite {
    /// Returns a JSON [`UpdateSummary`](maia_firq_json::UpdateSummary).
    pub fn to_json(&self, path: &Path) -> maia_firq_json::UpdateSummary {
        maia_firq_json::UpdateSummary {
            path: path.display().to_string(),
            matched: self.matched,
            updated: self.updated,
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Hardware coefficient source codec.
///
/// This struct knows the fixed-point format and the name of the coefficient
/// array, and uses them to extract and rewrite coefficient assignments.
///
/// # Examples
/// ```
/// use maia_firq::{format::FixedPointFormat, verilog::CoefficientSource};
/// let source = CoefficientSource::new(FixedPointFormat::Q8_8, "coefficients");
/// let text = "module fir;\nassign coefficients[0] = 16'h0006;\nendmodule\n";
/// let rewrite = source.rewrite(text, &[-5]);
/// assert_eq!(rewrite.updated, 1);
/// assert_eq!(
///     rewrite.text,
///     "module fir;\nassign coefficients[0] = 16'hFFFB;\nendmodule\n"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefficientSource {
    format: FixedPointFormat,
    array_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LineMatch {
    // not an assignment to the coefficient array
    Opaque,
    Assignment {
        index: usize,
        raw: i32,
        literal: Range<usize>,
    },
    Malformed(String),
}

impl CoefficientSource {
    /// Creates a new codec for a fixed-point format and coefficient array name.
    pub fn new(format: FixedPointFormat, array_name: &str) -> CoefficientSource {
        CoefficientSource {
            format,
            array_name: array_name.to_string(),
        }
    }

    /// Gives the fixed-point format.
    pub fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// Gives the name of the coefficient array.
    pub fn array_name(&self) -> &str {
        &self.array_name
    }

    /// Extracts the coefficient assignments of a hardware source.
    pub fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();
        for (position, (content, _)) in lines(text).enumerate() {
            match self.parse_line(content) {
                LineMatch::Opaque => (),
                LineMatch::Assignment {
                    index,
                    raw,
                    literal,
                } => extraction.assignments.push(AssignmentLine {
                    index,
                    hex_text: content[literal].to_string(),
                    line_position: position,
                    coefficient: QuantizedCoefficient::from_raw(raw, self.format),
                }),
                LineMatch::Malformed(reason) => {
                    skipped(&mut extraction.diagnostics, position, reason)
                }
            }
        }
        extraction
    }

    /// Rewrites the coefficient assignments of a hardware source.
    ///
    /// The `j`-th assignment found in the text gets its hexadecimal literal
    /// replaced by the encoding of `new_coefficients[j]`. The rest of the line
    /// and all the other lines are kept byte for byte. If there are more
    /// assignments than new coefficients, the remaining assignments are kept
    /// unmodified. New coefficients outside of the range of the format are
    /// saturated and reported as a [`Diagnostic::Saturated`].
    pub fn rewrite(&self, text: &str, new_coefficients: &[i32]) -> Rewrite {
        let mut out = String::with_capacity(text.len());
        let mut matched = 0;
        let mut diagnostics = Vec::new();
        for (position, (content, ending)) in lines(text).enumerate() {
            match self.parse_line(content) {
                LineMatch::Assignment { literal, .. } => {
                    match new_coefficients.get(matched) {
                        Some(&raw) => {
                            let raw = self.saturate(matched, raw, &mut diagnostics);
                            out.push_str(&content[..literal.start]);
                            out.push_str(&hex::encode(raw, self.format));
                            out.push_str(&content[literal.end..]);
                        }
                        None => out.push_str(content),
                    }
                    matched += 1;
                }
                LineMatch::Malformed(reason) => {
                    skipped(&mut diagnostics, position, reason);
                    out.push_str(content);
                }
                LineMatch::Opaque => out.push_str(content),
            }
            out.push_str(ending);
        }
        let updated = matched.min(new_coefficients.len());
        if new_coefficients.len() > matched {
            tracing::warn!(
                matched,
                provided = new_coefficients.len(),
                "more coefficients than assignments in hardware source"
            );
        }
        Rewrite {
            text: out,
            matched,
            updated,
            diagnostics,
        }
    }

    /// Renders a block of coefficient assignments.
    ///
    /// If `comments` is `true`, each line ends with a comment giving the real
    /// value of the coefficient.
    pub fn render(&self, coefficients: &[QuantizedCoefficient], comments: bool) -> String {
        coefficients
            .iter()
            .enumerate()
            .map(|(j, c)| {
                let mut line = format!(
                    "assign {}[{j}] = {}'h{};",
                    self.array_name,
                    self.format.total_bits(),
                    hex::encode(c.raw(), self.format)
                );
                if comments {
                    line.push_str(&format!(" // {:.6}", c.reconstructed()));
                }
                line.push('\n');
                line
            })
            .collect()
    }

    /// Extracts the coefficient assignments of a hardware source file.
    pub fn read_file(&self, path: &Path) -> Result<Extraction> {
        let text = artifact::read_text(path, artifact::VERILOG_SOURCE)?;
        let extraction = self.extract(&text);
        log_diagnostics(path, &extraction.diagnostics);
        Ok(extraction)
    }

    /// Rewrites the coefficient assignments of a hardware source file.
    ///
    /// The file is read fully and the new text is computed in memory before
    /// writing it atomically. The file is not written if its contents do not
    /// change.
    pub fn update_file(&self, path: &Path, new_coefficients: &[i32]) -> Result<Rewrite> {
        let text = artifact::read_text(path, artifact::VERILOG_SOURCE)?;
        let rewrite = self.rewrite(&text, new_coefficients);
        log_diagnostics(path, &rewrite.diagnostics);
        if rewrite.text != text {
            artifact::write_atomic(path, rewrite.text.as_bytes())?;
        }
        tracing::info!(
            path = %path.display(),
            updated = rewrite.updated,
            matched = rewrite.matched,
            "updated hardware coefficients"
        );
        Ok(rewrite)
    }

    // Clamps the j-th new coefficient to the range of the format.
    fn saturate(&self, j: usize, raw: i32, diagnostics: &mut Vec<Diagnostic>) -> i32 {
        let clamped = raw.clamp(self.format.min_raw(), self.format.max_raw());
        if clamped != raw {
            tracing::warn!(index = j, raw, clamped, "coefficient out of range");
            diagnostics.push(Diagnostic::Saturated {
                index: j,
                value: self.format.to_real(raw),
                raw: clamped,
            });
        }
        clamped
    }

    fn parse_line(&self, line: &str) -> LineMatch {
        let mut cursor = Cursor::new(line);
        cursor.skip_whitespace();
        if !cursor.keyword("assign") || !cursor.skip_whitespace() {
            return LineMatch::Opaque;
        }
        if cursor.identifier() != Some(self.array_name.as_str()) {
            return LineMatch::Opaque;
        }
        // From here on the line is an assignment to the coefficient array.
        match self.parse_assignment(&mut cursor) {
            Ok((index, raw, literal)) => LineMatch::Assignment {
                index,
                raw,
                literal,
            },
            Err(reason) => LineMatch::Malformed(reason),
        }
    }

    fn parse_assignment(
        &self,
        cursor: &mut Cursor<'_>,
    ) -> std::result::Result<(usize, i32, Range<usize>), String> {
        cursor.skip_whitespace();
        cursor.expect('[')?;
        cursor.skip_whitespace();
        let index = cursor.number("index")?;
        cursor.skip_whitespace();
        cursor.expect(']')?;
        cursor.skip_whitespace();
        cursor.expect('=')?;
        cursor.skip_whitespace();
        let width = cursor.number("literal width")?;
        if width != usize::from(self.format.total_bits()) {
            return Err(format!(
                "literal width {width} does not match the {}-bit format",
                self.format.total_bits()
            ));
        }
        cursor.expect('\'')?;
        if !(cursor.eat('h') || cursor.eat('H')) {
            return Err("literal is not hexadecimal".to_string());
        }
        let literal = cursor.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let raw = hex::decode(cursor.slice(&literal), self.format).map_err(|e| e.to_string())?;
        cursor.skip_whitespace();
        cursor.expect(';')?;
        Ok((index, raw, literal))
    }
}

fn skipped(diagnostics: &mut Vec<Diagnostic>, line: usize, reason: String) {
    diagnostics.push(Diagnostic::Skipped { line, reason });
}

fn log_diagnostics(path: &Path, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        if let Diagnostic::Skipped { line, reason } = diagnostic {
            tracing::warn!(
                path = %path.display(),
                line = line + 1,
                reason = %reason,
                "skipped malformed coefficient assignment"
            );
        }
    }
}

// Splits a text into lines, separating each line from its line ending. The
// concatenation of all the pieces gives back the text.
fn lines(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split_inclusive('\n').map(|line| {
        let content = line
            .strip_suffix("\r\n")
            .or_else(|| line.strip_suffix('\n'))
            .unwrap_or(line);
        (content, &line[content.len()..])
    })
}

struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Cursor<'a> {
        Cursor { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn slice(&self, range: &Range<usize>) -> &'a str {
        &self.line[range.clone()]
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> Range<usize> {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !f(c))
            .unwrap_or(self.rest().len());
        self.pos += len;
        start..self.pos
    }

    // Returns true if some whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        !self.take_while(char::is_whitespace).is_empty()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> std::result::Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(format!("expected '{c}' at column {}", self.pos + 1))
        }
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        if self.rest().starts_with(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> Option<&'a str> {
        let ident = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if ident.is_empty() {
            None
        } else {
            Some(self.slice(&ident))
        }
    }

    fn number(&mut self, what: &str) -> std::result::Result<usize, String> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        self.slice(&digits)
            .parse::<usize>()
            .map_err(|_| format!("expected {what} at column {}", digits.start + 1))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SOURCE: &str = "\
module fir_filter_folded (
    input clk,
    input signed [15:0] x_in
);
// 16-bit coefficients, Q8.8
wire signed [15:0] coefficients [0:5];
assign coefficients[0] = 16'h0006;
assign coefficients[1] = 16'h000D;
  assign coefficients [2] = 16'h001E; // center-2
assign coefficients[3] = 16'h002C;
assign coefficients[4] = 16'h0034;
assign coefficients[5] = 16'h0037;
assign y_out = acc[23:8];
endmodule
";

    fn source() -> CoefficientSource {
        CoefficientSource::new(FixedPointFormat::Q8_8, "coefficients")
    }

    #[test]
    fn extract() {
        let extraction = source().extract(SOURCE);
        assert!(extraction.diagnostics.is_empty());
        assert_eq!(extraction.raw(), vec![6, 13, 30, 44, 52, 55]);
        let a = &extraction.assignments[2];
        assert_eq!(a.index, 2);
        assert_eq!(a.hex_text, "001E");
        assert_eq!(a.line_position, 8);
        assert_eq!(a.coefficient.reconstructed(), 30.0 / 256.0);
    }

    #[test]
    fn rewrite() {
        let new = [-5, 1, 2, 3, 4, 256];
        let rewrite = source().rewrite(SOURCE, &new);
        assert_eq!(rewrite.matched, 6);
        assert_eq!(rewrite.updated, 6);
        let expected = SOURCE
            .replace("16'h0006", "16'hFFFB")
            .replace("16'h000D", "16'h0001")
            .replace("16'h001E", "16'h0002")
            .replace("16'h002C", "16'h0003")
            .replace("16'h0034", "16'h0004")
            .replace("16'h0037", "16'h0100");
        assert_eq!(rewrite.text, expected);
        assert_eq!(source().extract(&rewrite.text).raw(), new.to_vec());
    }

    #[test]
    fn passthrough() {
        let rewrite = source().rewrite(SOURCE, &[1, 2, 3, 4, 5, 6]);
        let assignments = source().extract(SOURCE);
        let positions = assignments
            .assignments
            .iter()
            .map(|a| a.line_position)
            .collect::<Vec<_>>();
        for (j, (old, new)) in SOURCE.lines().zip(rewrite.text.lines()).enumerate() {
            if !positions.contains(&j) {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn fewer_coefficients() {
        let rewrite = source().rewrite(SOURCE, &[1, 2]);
        assert_eq!(rewrite.matched, 6);
        assert_eq!(rewrite.updated, 2);
        assert_eq!(
            source().extract(&rewrite.text).raw(),
            vec![1, 2, 30, 44, 52, 55]
        );
    }

    #[test]
    fn more_coefficients() {
        let rewrite = source().rewrite(SOURCE, &[0; 10]);
        assert_eq!(rewrite.updated, 6);
        assert_eq!(source().extract(&rewrite.text).raw(), vec![0; 6]);
    }

    #[test]
    fn idempotent() {
        let new = [7, 8, 9, 10, 11, 12];
        let once = source().rewrite(SOURCE, &new);
        let twice = source().rewrite(&once.text, &new);
        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn line_endings() {
        let text = "assign coefficients[0] = 16'h0000;\r\n// x\r\nassign coefficients[1] = 16'h0000;";
        let rewrite = source().rewrite(text, &[1, 2]);
        assert_eq!(
            rewrite.text,
            "assign coefficients[0] = 16'h0001;\r\n// x\r\nassign coefficients[1] = 16'h0002;"
        );
    }

    #[test]
    fn malformed_lines() {
        let text = "\
assign coefficients[0] = 16'h0006;
assign coefficients[1] = 16'hXYZW;
assign coefficients[2] = 12'h006;
assign coefficients[3] = 16'h06;
assign coefficients[4] = 16'h0006
assign coefficients_b[0] = 16'h0006;
// assign coefficients[5] = 16'h0006;
assign out = 16'h0000;
";
        let extraction = source().extract(text);
        assert_eq!(extraction.raw(), vec![6]);
        let lines = extraction
            .diagnostics
            .iter()
            .map(|d| match d {
                Diagnostic::Skipped { line, .. } => *line,
                _ => unreachable!(),
            })
            .collect::<Vec<_>>();
        assert_eq!(lines, vec![1, 2, 3, 4]);
        // malformed lines are kept
        let rewrite = source().rewrite(text, &[1, 2, 3]);
        assert_eq!(rewrite.updated, 1);
        assert_eq!(rewrite.text, text.replacen("16'h0006;", "16'h0001;", 1));
    }

    #[test]
    fn out_of_range_coefficients() {
        let text = "assign coefficients[0] = 16'h0000;\nassign coefficients[1] = 16'h0000;\n";
        let rewrite = source().rewrite(text, &[40000, -40000]);
        assert_eq!(
            rewrite.text,
            "assign coefficients[0] = 16'h7FFF;\nassign coefficients[1] = 16'h8000;\n"
        );
        assert_eq!(
            rewrite.diagnostics,
            vec![
                Diagnostic::Saturated {
                    index: 0,
                    value: 40000.0 / 256.0,
                    raw: 32767
                },
                Diagnostic::Saturated {
                    index: 1,
                    value: -40000.0 / 256.0,
                    raw: -32768
                }
            ]
        );
        assert_eq!(source().extract(&rewrite.text).raw(), vec![32767, -32768]);

        let format = "u4.4".parse::<FixedPointFormat>().unwrap();
        let source = CoefficientSource::new(format, "h");
        let rewrite = source.rewrite("assign h[0] = 8'h00;\nassign h[1] = 8'h00;\n", &[-1, 300]);
        assert_eq!(rewrite.text, "assign h[0] = 8'h00;\nassign h[1] = 8'hFF;\n");
        assert_eq!(rewrite.diagnostics.len(), 2);
    }

    #[test]
    fn substring_false_positives() {
        // lines that mention the array and contain "16" are not assignments
        let text = "wire [15:0] coefficients [0:16]; // assign coefficients 16'h0\n";
        let extraction = source().extract(text);
        assert!(extraction.assignments.is_empty());
        assert!(extraction.diagnostics.is_empty());
    }

    #[test]
    fn other_formats() {
        let format = FixedPointFormat::new(18, 17, true).unwrap();
        let source = CoefficientSource::new(format, "h");
        let text = "assign h[0] = 18'h3FFFF;\nassign h[1]=18'H00001;\n";
        assert_eq!(source.extract(text).raw(), vec![-1, 1]);
        let rewrite = source.rewrite(text, &[2, -2]);
        assert_eq!(
            rewrite.text,
            "assign h[0] = 18'h00002;\nassign h[1]=18'H3FFFE;\n"
        );
    }

    #[test]
    fn render() {
        let coefficients = [6, -5]
            .map(|raw| QuantizedCoefficient::from_raw(raw, FixedPointFormat::Q8_8))
            .to_vec();
        assert_eq!(
            source().render(&coefficients, false),
            "assign coefficients[0] = 16'h0006;\nassign coefficients[1] = 16'hFFFB;\n"
        );
        assert_eq!(
            source().render(&coefficients, true),
            "assign coefficients[0] = 16'h0006; // 0.023438\n\
             assign coefficients[1] = 16'hFFFB; // -0.019531\n"
        );
        // rendered lines can be read back
        let text = source().render(&coefficients, true);
        assert_eq!(source().extract(&text).raw(), vec![6, -5]);
    }

    #[test]
    fn files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fir_filter_folded.v");
        std::fs::write(&path, SOURCE).unwrap();
        let rewrite = source().update_file(&path, &[1, 2, 3]).unwrap();
        assert_eq!(rewrite.updated, 3);
        let extraction = source().read_file(&path).unwrap();
        assert_eq!(extraction.raw(), vec![1, 2, 3, 44, 52, 55]);
        let missing = source().read_file(&dir.path().join("missing.v"));
        assert!(missing.unwrap_err().is_recoverable());
    }
}
