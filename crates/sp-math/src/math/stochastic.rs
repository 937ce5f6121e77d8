//! Stochastic-row helpers.
//!
//! A row of a transition matrix is a probability distribution over next
//! states. Estimation produces rows of raw counts; these helpers turn
//! counts into distributions and validate the result.

/// Tolerance for row-sum checks.
pub const ROW_SUM_TOL: f64 = 1e-9;

/// Normalize a row of counts into a probability distribution, in place.
///
/// A row whose total is zero becomes the uniform distribution; this is the
/// defined fallback for unobserved states when the observation threshold
/// is zero, never a silent divide-by-zero.
pub fn normalize_row(row: &mut [f64]) {
    if row.is_empty() {
        return;
    }
    let total: f64 = row.iter().sum();
    if total > 0.0 {
        for v in row.iter_mut() {
            *v /= total;
        }
    } else {
        let uniform = 1.0 / row.len() as f64;
        for v in row.iter_mut() {
            *v = uniform;
        }
    }
}

/// Whether the row sums to 1 within `tol` and has no negative entries.
pub fn is_stochastic_row(row: &[f64], tol: f64) -> bool {
    if row.iter().any(|&v| v < 0.0 || !v.is_finite()) {
        return false;
    }
    let total: f64 = row.iter().sum();
    (total - 1.0).abs() <= tol
}

/// Approximate equality with an absolute tolerance.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    (a - b).abs() <= tol
}
