use thiserror::Error;

/// A result type for design search errors
pub type Result<T> = std::result::Result<T, DexError>;

/// An error for the design search algorithms
#[derive(Error, Debug)]
pub enum DexError {
    /// When configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When surrogate training fails
    #[error("GP error: {0}")]
    GpError(#[from] optex_gp::GpError),
    /// When an invalid value is encountered
    #[error("Value error: {0}")]
    InvalidValue(String),
    /// When a linear algebra routine fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
}
