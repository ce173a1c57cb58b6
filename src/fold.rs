//! Symmetric folding.
//!
//! A linear-phase FIR filter with an odd number of taps `N = 2K - 1` has a
//! symmetric impulse response, so the folded hardware architecture only stores
//! the first `K` coefficients (including the center tap) and shares each
//! multiplier between a tap and its mirror.

/// Folds a symmetric coefficient list.
///
/// Returns the first `(N + 1) / 2` coefficients. The list must have odd length
/// and be symmetric. This is a precondition, which is only checked with debug
/// assertions.
pub fn fold(full: &[f64]) -> Vec<f64> {
    debug_assert!(full.len() % 2 == 1, "folded filters must have odd length");
    debug_assert!(
        full.iter().eq(full.iter().rev()),
        "folded filters must be symmetric"
    );
    full[..full.len().div_ceil(2)].to_vec()
}

/// Unfolds a half coefficient list.
///
/// The result is `half` followed by `half` reversed without its last element
/// (the center tap), which has length `2K - 1`.
///
/// # Examples
/// ```
/// use maia_firq::fold::unfold;
/// assert_eq!(unfold(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0, 2.0, 1.0]);
/// assert_eq!(unfold(&[1.0]), vec![1.0]);
/// ```
pub fn unfold<T: Copy>(half: &[T]) -> Vec<T> {
    let Some((_, mirrored)) = half.split_last() else {
        return Vec::new();
    };
    half.iter().chain(mirrored.iter().rev()).copied().collect()
}

/// Checks if a coefficient list is symmetric with odd length.
///
/// Coefficients are compared with an absolute `tolerance`, since designs
/// loaded from text files may not be exactly symmetric.
pub fn is_symmetric(full: &[f64], tolerance: f64) -> bool {
    full.len() % 2 == 1
        && full
            .iter()
            .zip(full.iter().rev())
            .all(|(a, b)| (a - b).abs() <= tolerance)
}
