use crate::errors::{DexError, Result};
use libm::erfc;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

const SQRT_2PI: f64 = 2.5066282746310007;

pub(crate) fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

pub(crate) fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

/// Flattens a `(runs, settings)` design matrix into a row-major vector, the
/// representation used by the surrogate refinement loop.
pub fn flatten_design(design: &ArrayView2<f64>) -> Array1<f64> {
    Array1::from_iter(design.iter().cloned())
}

/// Reshapes a flattened design vector back into its `(runs, settings)` matrix
/// form. Inverse of [`flatten_design`] (exact round trip).
pub fn reshape_design(x: &ArrayView1<f64>, runs: usize, settings: usize) -> Result<Array2<f64>> {
    if x.len() != runs * settings {
        return Err(DexError::InvalidValue(format!(
            "Cannot reshape {} values into a ({}, {}) design",
            x.len(),
            runs,
            settings
        )));
    }
    x.to_owned()
        .into_shape((runs, settings))
        .map_err(|err| DexError::InvalidValue(err.to_string()))
}
