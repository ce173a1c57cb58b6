//! Two's-complement hexadecimal literals.
//!
//! Coefficients are written in the hardware source as fixed-width,
//! zero-padded, uppercase hexadecimal literals holding the two's-complement
//! bit pattern of the raw integer.

use crate::format::FixedPointFormat;
use thiserror::Error;

/// Errors that can occur when decoding a hexadecimal literal.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum HexError {
    /// The literal does not have the number of digits of the format.
    #[error("{literal:?} has {actual} digits (expected {expected})")]
    Width {
        /// Offending literal.
        literal: String,
        /// Number of digits required by the format.
        expected: usize,
        /// Number of digits of the literal.
        actual: usize,
    },
    /// The literal contains a character which is not a hexadecimal digit.
    #[error("{0:?} is not a hexadecimal number")]
    InvalidDigit(String),
    /// The literal has more bits than the format.
    #[error("{literal:?} does not fit in {bits} bits")]
    Overflow {
        /// Offending literal.
        literal: String,
        /// Total bits of the format.
        bits: u8,
    },
}

/// Encodes a raw integer as a hexadecimal literal.
///
/// Negative values are encoded by keeping the lower `total_bits` bits of their
/// two's-complement representation.
///
/// # Examples
/// ```
/// use maia_firq::{format::FixedPointFormat, hex};
/// assert_eq!(hex::encode(-5, FixedPointFormat::Q8_8), "FFFB");
/// assert_eq!(hex::encode(55, FixedPointFormat::Q8_8), "0037");
/// ```
pub fn encode(raw: i32, format: FixedPointFormat) -> String {
    debug_assert!((format.min_raw()..=format.max_raw()).contains(&raw));
    let bits = if raw < 0 {
        (raw as u32) & format.mask()
    } else {
        raw as u32
    };
    format!("{bits:0width$X}", width = format.hex_digits())
}

/// Decodes a hexadecimal literal into a raw integer.
///
/// The literal must have exactly the number of digits of the format. Both
/// upper and lower case digits are accepted. For signed formats, values with
/// the sign bit set are interpreted in two's complement.
pub fn decode(literal: &str, format: FixedPointFormat) -> Result<i32, HexError> {
    let expected = format.hex_digits();
    if !literal.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HexError::InvalidDigit(literal.to_string()));
    }
    // all digits are ASCII, so the length is the number of digits
    if literal.len() != expected {
        return Err(HexError::Width {
            literal: literal.to_string(),
            expected,
            actual: literal.len(),
        });
    }
    let value = u32::from_str_radix(literal, 16)
        .map_err(|_| HexError::InvalidDigit(literal.to_string()))?;
    if value > format.mask() {
        return Err(HexError::Overflow {
            literal: literal.to_string(),
            bits: format.total_bits(),
        });
    }
    let value = i64::from(value);
    let bits = format.total_bits();
    let value = if format.signed() && value >= 1i64 << (bits - 1) {
        value - (1i64 << bits)
    } else {
        value
    };
    // Unsigned 32-bit values above i32::MAX cannot be represented as raw
    // integers.
    i32::try_from(value).map_err(|_| HexError::Overflow {
        literal: literal.to_string(),
        bits: 31,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_q8_8() {
        let format = FixedPointFormat::Q8_8;
        assert_eq!(encode(-5, format), "FFFB");
        assert_eq!(encode(0, format), "0000");
        assert_eq!(encode(256, format), "0100");
        assert_eq!(encode(-32768, format), "8000");
        assert_eq!(encode(32767, format), "7FFF");
    }

    #[test]
    fn decode_q8_8() {
        let format = FixedPointFormat::Q8_8;
        assert_eq!(decode("FFFB", format), Ok(-5));
        assert_eq!(decode("fffb", format), Ok(-5));
        assert_eq!(decode("0037", format), Ok(55));
        assert_eq!(decode("8000", format), Ok(-32768));
    }

    #[test]
    fn round_trip() {
        for format in [
            FixedPointFormat::Q8_8,
            FixedPointFormat::new(12, 6, true).unwrap(),
            FixedPointFormat::new(8, 4, false).unwrap(),
            FixedPointFormat::new(18, 17, true).unwrap(),
        ] {
            for raw in format.min_raw()..=format.max_raw() {
                assert_eq!(decode(&encode(raw, format), format), Ok(raw));
            }
        }
    }

    #[test]
    fn odd_widths() {
        // 18 bits need 5 digits, with the top digit holding only 2 bits
        let format = FixedPointFormat::new(18, 17, true).unwrap();
        assert_eq!(encode(-1, format), "3FFFF");
        assert_eq!(decode("3FFFF", format), Ok(-1));
        assert!(matches!(
            decode("7FFFF", format),
            Err(HexError::Overflow { bits: 18, .. })
        ));
    }

    #[test]
    fn malformed() {
        let format = FixedPointFormat::Q8_8;
        assert!(matches!(decode("FFB", format), Err(HexError::Width { .. })));
        assert!(matches!(
            decode("0FFFB", format),
            Err(HexError::Width { .. })
        ));
        assert!(matches!(
            decode("FFXB", format),
            Err(HexError::InvalidDigit(_))
        ));
        assert!(matches!(decode("", format), Err(HexError::Width { .. })));
        assert!(matches!(
            decode("+FFB", format),
            Err(HexError::InvalidDigit(_))
        ));
    }
}
