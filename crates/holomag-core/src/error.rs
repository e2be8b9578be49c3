//! Error type shared by the field converter, projectors, phase mappers and
//! the forward model.

use holomag_spectral::SpectralError;
use thiserror::Error;

/// Errors that can occur anywhere in the mapping pipeline.
///
/// All of these are caller or configuration bugs: nothing here is retryable
/// and no partial results accompany an error.
#[derive(Debug, Error)]
pub enum HoloError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dimension mismatch in {context}: expected length {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error("Spectral backend error: {0}")]
    Spectral(#[from] SpectralError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HoloError>;

/// Check a vector length against the expected operator dimension.
pub(crate) fn check_len(context: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(HoloError::DimensionMismatch {
            context,
            expected,
            found,
        });
    }
    Ok(())
}
