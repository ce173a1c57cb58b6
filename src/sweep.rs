//! Bit-width sweep.
//!
//! Computes the quantization error of a design for several coefficient widths.
//! The scale of the base format is kept for every width, so only the range of
//! the raw integers changes. Narrow widths show up as saturation error.

use crate::{
    error::{Error, Result},
    format::FixedPointFormat,
    quantize::round_clamp,
};

/// Computes the quantization error of `coeffs` for each width in `widths`.
///
/// Each width uses the scale (fractional bits) and the signedness of `format`,
/// and clamps the raw integers to the range of a word of that width. An error
/// is returned if a width is not between 1 and 32.
pub fn bit_width_sweep(
    coeffs: &[f64],
    format: FixedPointFormat,
    widths: &[u8],
) -> Result<Vec<maia_firq_json::SweepPoint>> {
    widths
        .iter()
        .map(|&bits| {
            let (min, max) = word_range(bits, format.signed())?;
            let scale = format.scale();
            let squared_error = coeffs
                .iter()
                .map(|&c| {
                    let (raw, _) = round_clamp(c, scale, min, max);
                    (c - f64::from(raw) / scale).powi(2)
                })
                .sum::<f64>();
            Ok(maia_firq_json::SweepPoint {
                total_bits: bits,
                fractional_bits: format.fractional_bits(),
                mse: if coeffs.is_empty() {
                    0.0
                } else {
                    squared_error / coeffs.len() as f64
                },
            })
        })
        .collect()
}

// Range of the raw integers of a word, limited to the range of i32.
fn word_range(bits: u8, signed: bool) -> Result<(i32, i32)> {
    if !(1..=32).contains(&bits) {
        return Err(Error::InvalidParameter(format!(
            "coefficient widths must be between 1 and 32 bits (got {bits})"
        )));
    }
    let (min, max) = if signed {
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    } else {
        (0, (1i64 << bits) - 1)
    };
    Ok((
        i32::try_from(min).unwrap_or(i32::MIN),
        i32::try_from(max).unwrap_or(i32::MAX),
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{constants::DEFAULT_SWEEP_WIDTHS, quantize::quantize};

    #[test]
    fn scale_is_kept() {
        let coeffs = crate::fold::unfold(&[0.0234, 0.0513, 0.1172, 0.1719, 0.2031, 0.2145]);
        let sweep =
            bit_width_sweep(&coeffs, FixedPointFormat::Q8_8, &DEFAULT_SWEEP_WIDTHS).unwrap();
        assert_eq!(
            sweep.iter().map(|p| p.total_bits).collect::<Vec<_>>(),
            DEFAULT_SWEEP_WIDTHS.to_vec()
        );
        assert!(sweep.iter().all(|p| p.fractional_bits == 8));
        // nothing saturates even at 8 bits, so the error is the Q8.8 error
        // for every width
        let mse = quantize(&coeffs, FixedPointFormat::Q8_8).mse();
        assert!(mse > 0.0);
        assert!(sweep.iter().all(|p| p.mse == mse));
    }

    #[test]
    fn narrow_widths_saturate() {
        // 1.5 is 384 at Q8.8, which does not fit in 8 bits
        let sweep = bit_width_sweep(&[1.5, 0.1], FixedPointFormat::Q8_8, &[8, 12, 16]).unwrap();
        let expected = ((1.5_f64 - 127.0 / 256.0).powi(2) + (0.1_f64 - 26.0 / 256.0).powi(2)) / 2.0;
        assert!((sweep[0].mse - expected).abs() < 1e-15);
        assert!(sweep[0].mse > sweep[1].mse);
        assert_eq!(sweep[1].mse, sweep[2].mse);
        // a width narrower than the fractional bits only clips
        let sweep = bit_width_sweep(&[0.01], FixedPointFormat::Q8_8, &[4]).unwrap();
        assert_eq!(sweep[0].mse, quantize(&[0.01], FixedPointFormat::Q8_8).mse());
    }

    #[test]
    fn unsigned_formats() {
        let format = "u8.8".parse::<FixedPointFormat>().unwrap();
        let sweep = bit_width_sweep(&[-0.5, 0.5], format, &[8]).unwrap();
        // -0.5 clamps to 0, 0.5 is 128
        assert_eq!(sweep[0].mse, 0.25 / 2.0);
    }

    #[test]
    fn invalid_width() {
        assert!(bit_width_sweep(&[0.5], FixedPointFormat::Q8_8, &[40]).is_err());
        assert!(bit_width_sweep(&[0.5], FixedPointFormat::Q8_8, &[0]).is_err());
    }
}
