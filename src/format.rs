//! Fixed-point formats.
//!
//! This module contains [`FixedPointFormat`], which describes how the FIR
//! coefficients are represented in the hardware.

use crate::error::{Error, Result};

/// Fixed-point format.
///
/// A format is given by its total number of bits, its number of fractional
/// bits, and its signedness. The real value represented by a raw integer `x`
/// is `x / 2^fractional_bits`.
///
/// # Examples
/// ```
/// use maia_firq::format::FixedPointFormat;
/// let format: FixedPointFormat = "q8.8".parse()?;
/// assert_eq!(format, FixedPointFormat::Q8_8);
/// assert_eq!(format.min_raw(), -32768);
/// assert_eq!(format.max_raw(), 32767);
/// assert_eq!(format.hex_digits(), 4);
/// # Ok::<(), maia_firq::Error>(())
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FixedPointFormat {
    total_bits: u8,
    fractional_bits: u8,
    signed: bool,
}

impl FixedPointFormat {
    /// Signed format with 8 integer bits and 8 fractional bits.
    pub const Q8_8: FixedPointFormat = FixedPointFormat {
        total_bits: 16,
        fractional_bits: 8,
        signed: true,
    };

    /// Signed format with 4 integer bits and 12 fractional bits.
    pub const Q4_12: FixedPointFormat = FixedPointFormat {
        total_bits: 16,
        fractional_bits: 12,
        signed: true,
    };

    /// Creates a new fixed-point format.
    ///
    /// An error is returned if `total_bits` is not between 1 and 32, or if it
    /// cannot hold the fractional bits (and the sign bit, for signed formats).
    pub fn new(total_bits: u8, fractional_bits: u8, signed: bool) -> Result<FixedPointFormat> {
        if !(1..=32).contains(&total_bits) {
            return Err(Error::InvalidFormat(format!(
                "total bits must be between 1 and 32 (got {total_bits})"
            )));
        }
        let needed = u16::from(fractional_bits) + u16::from(signed);
        if u16::from(total_bits) < needed {
            return Err(Error::InvalidFormat(format!(
                "{total_bits} bits cannot hold {fractional_bits} fractional bits{}",
                if signed { " and a sign bit" } else { "" }
            )));
        }
        Ok(FixedPointFormat {
            total_bits,
            fractional_bits,
            signed,
        })
    }

    /// Creates a signed format using half of the bits as fractional bits.
    pub fn from_bits(total_bits: u8) -> Result<FixedPointFormat> {
        FixedPointFormat::new(total_bits, total_bits / 2, true)
    }

    /// Gives the total number of bits.
    pub fn total_bits(&self) -> u8 {
        self.total_bits
    }

    /// Gives the number of fractional bits.
    pub fn fractional_bits(&self) -> u8 {
        self.fractional_bits
    }

    /// Returns `true` if the format is signed (two's complement).
    pub fn signed(&self) -> bool {
        self.signed
    }

    /// Gives the scale `2^fractional_bits` between real values and raw integers.
    pub fn scale(&self) -> f64 {
        f64::from(self.fractional_bits).exp2()
    }

    /// Gives the value of one least significant bit.
    pub fn lsb(&self) -> f64 {
        self.scale().recip()
    }

    /// Gives the minimum raw integer.
    pub fn min_raw(&self) -> i32 {
        if self.signed {
            i32::try_from(-(1i64 << (self.total_bits - 1))).unwrap_or(i32::MIN)
        } else {
            0
        }
    }

    /// Gives the maximum raw integer.
    ///
    /// For 32-bit unsigned formats this is limited to `i32::MAX`.
    pub fn max_raw(&self) -> i32 {
        let bits = if self.signed {
            self.total_bits - 1
        } else {
            self.total_bits
        };
        i32::try_from((1i64 << bits) - 1).unwrap_or(i32::MAX)
    }

    /// Gives the mask `2^total_bits - 1` used for two's-complement encoding.
    pub fn mask(&self) -> u32 {
        u32::MAX >> (32 - u32::from(self.total_bits))
    }

    /// Gives the number of hexadecimal digits of a literal in this format.
    pub fn hex_digits(&self) -> usize {
        usize::from(self.total_bits).div_ceil(4)
    }

    /// Converts a raw integer to the real value it represents.
    pub fn to_real(&self, raw: i32) -> f64 {
        f64::from(raw) / self.scale()
    }
}

impl Default for FixedPointFormat {
    fn default() -> FixedPointFormat {
        FixedPointFormat::Q8_8
    }
}

impl std::fmt::Display for FixedPointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        let prefix = if self.signed { "Q" } else { "U" };
        write!(
            f,
            "{prefix}{}.{}",
            self.total_bits - self.fractional_bits,
            self.fractional_bits
        )
    }
}

impl std::str::FromStr for FixedPointFormat {
    type Err = Error;

    /// Parses formats such as `q8.8`, `Q4.12` or `u8.8`.
    ///
    /// The number before the dot counts the integer bits, including the sign
    /// bit for signed (`q`) formats.
    fn from_str(s: &str) -> Result<FixedPointFormat> {
        let invalid = || Error::InvalidFormat(format!("cannot parse {s:?} (expected q<m>.<n>)"));
        let mut chars = s.chars();
        let signed = match chars.next() {
            Some('q' | 'Q') => true,
            Some('u' | 'U') => false,
            _ => return Err(invalid()),
        };
        let (integer, fractional) = chars.as_str().split_once('.').ok_or_else(invalid)?;
        let integer = integer.parse::<u8>().map_err(|_| invalid())?;
        let fractional = fractional.parse::<u8>().map_err(|_| invalid())?;
        let total = integer.checked_add(fractional).ok_or_else(invalid)?;
        FixedPointFormat::new(total, fractional, signed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn q8_8() {
        let format = FixedPointFormat::Q8_8;
        assert_eq!(format.min_raw(), -32768);
        assert_eq!(format.max_raw(), 32767);
        assert_eq!(format.mask(), 0xffff);
        assert_eq!(format.scale(), 256.0);
        assert_eq!(format.lsb(), 1.0 / 256.0);
        assert_eq!(format.to_real(-5), -5.0 / 256.0);
        assert_eq!(format.to_string(), "Q8.8");
    }

    #[test]
    fn parse() {
        assert_eq!(
            "Q4.12".parse::<FixedPointFormat>().unwrap(),
            FixedPointFormat::Q4_12
        );
        let format = "u4.4".parse::<FixedPointFormat>().unwrap();
        assert!(!format.signed());
        assert_eq!(format.min_raw(), 0);
        assert_eq!(format.max_raw(), 255);
        assert_eq!(format.hex_digits(), 2);
        assert!("8.8".parse::<FixedPointFormat>().is_err());
        assert!("q8".parse::<FixedPointFormat>().is_err());
        assert!("q20.20".parse::<FixedPointFormat>().is_err());
    }

    #[test]
    fn invalid() {
        assert!(FixedPointFormat::new(0, 0, false).is_err());
        assert!(FixedPointFormat::new(33, 8, true).is_err());
        // signed formats need room for the sign bit
        assert!(FixedPointFormat::new(8, 8, true).is_err());
        assert!(FixedPointFormat::new(8, 8, false).is_ok());
    }

    #[test]
    fn wide_formats() {
        let format = FixedPointFormat::new(32, 16, true).unwrap();
        assert_eq!(format.min_raw(), i32::MIN);
        assert_eq!(format.max_raw(), i32::MAX);
        assert_eq!(format.mask(), u32::MAX);
        let format = FixedPointFormat::new(32, 16, false).unwrap();
        assert_eq!(format.max_raw(), i32::MAX);
        let format = FixedPointFormat::new(18, 17, true).unwrap();
        assert_eq!(format.hex_digits(), 5);
        assert_eq!(format.min_raw(), -131072);
    }

    #[test]
    fn from_bits() {
        let format = FixedPointFormat::from_bits(12).unwrap();
        assert_eq!(format.total_bits(), 12);
        assert_eq!(format.fractional_bits(), 6);
        assert!(format.signed());
    }
}
