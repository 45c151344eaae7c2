//! L2 squared distance.

/// Squared Euclidean distance: `sum((a_i - b_i)^2)`.
///
/// Does not take the square root, since squared distances preserve
/// ordering and are cheaper to compute.
///
/// # Panics
///
/// Panics if `a` and `b` have different lengths.
#[inline]
#[must_use]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "dimension mismatch: {} != {}",
        a.len(),
        b.len()
    );
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let diff = x - y;
        sum += diff * diff;
    }
    sum
}
