use thiserror::Error;

/// A result type for GP errors
pub type Result<T> = std::result::Result<T, GpError>;

/// An error for Gaussian process surrogate computation
#[derive(Error, Debug)]
pub enum GpError {
    /// When the correlation matrix cannot be factorized
    #[error("Likelihood computation error: {0}")]
    LikelihoodComputationError(String),
    /// When an invalid value is encountered
    #[error("Value error: {0}")]
    InvalidValue(String),
    /// When a linear algebra routine fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
}
