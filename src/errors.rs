use thiserror::Error;

/// A result type for emulation toolkit errors
pub type Result<T> = std::result::Result<T, ExauqError>;

/// An error when building designs or emulators
#[derive(Error, Debug)]
pub enum ExauqError {
    /// When a simulator domain cannot be built from the given bounds
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    /// When a simulator input or training datum gets a bad coordinate
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// When an argument has a bad value
    #[error("Value error: {0}")]
    InvalidValue(String),
    /// When an emulator is asked for predictions before any training
    #[error("Cannot make prediction because emulator has not been trained on any data.")]
    NotTrained,
    /// When a prediction is requested at an input of the wrong dimension
    #[error(
        "Expected 'x' to be an Input with {expected} coordinates, but it has {actual} instead."
    )]
    DimensionMismatch {
        /// Dimension of the training inputs
        expected: usize,
        /// Dimension of the given input
        actual: usize,
    },
    /// When the underlying GP fails
    #[error("GP error")]
    GpError(#[from] exauq_gp::GpError),
}
