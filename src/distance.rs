use crate::error::StoreError;
use ndarray::ArrayView1;

/// Compute the squared Euclidean distance between two vectors.
///
/// An empty operand stands for an undefined centroid and compares as
/// infinitely far, so callers can rank candidates without special-casing
/// clusters that have no members yet.
///
/// # Errors
///
/// Returns [`StoreError::DimensionMismatch`] if both vectors are non-empty
/// and their lengths differ.
#[inline]
pub fn squared_euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> Result<f64, StoreError> {
    if a.is_empty() || b.is_empty() {
        return Ok(f64::INFINITY);
    }

    if a.len() != b.len() {
        return Err(StoreError::DimensionMismatch(format!(
            "cannot compare vectors of length {} and {}",
            a.len(),
            b.len()
        )));
    }

    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = x - y;
        sum += d * d;
    }
    Ok(sum)
}

/// Compute the Euclidean distance between two vectors.
///
/// Same contract as [`squared_euclidean`]; the square root is taken only
/// here so ranking loops can stay on squared distances.
#[inline]
pub fn euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> Result<f64, StoreError> {
    squared_euclidean(a, b).map(f64::sqrt)
}
