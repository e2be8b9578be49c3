//! Spectral backend trait and backend selection.
//!
//! The [`SpectralBackend`] trait abstracts over FFT engines with different
//! padding policies so that the kernel convolutions in `holomag-core` stay
//! independent of the transform sizes actually used.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors originating from spectral backends.
#[derive(Debug, Error)]
pub enum SpectralError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Spectrum shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Invalid transform shape: {0}")]
    InvalidShape(String),

    #[error("FFT plan cache is poisoned")]
    PlannerPoisoned,
}

/// The padding policy of a spectral backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Pad every axis to the smallest power of two >= `2 * len`.
    #[serde(alias = "pow2")]
    PowerOfTwo,
    /// Pad every axis to `2 * len` (always even).
    #[default]
    Even,
}

impl BackendType {
    /// Padded length of one axis of original length `len`.
    pub fn padded_len(self, len: usize) -> usize {
        match self {
            BackendType::PowerOfTwo => (2 * len).next_power_of_two(),
            BackendType::Even => 2 * len,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::PowerOfTwo => write!(f, "power_of_two"),
            BackendType::Even => write!(f, "even"),
        }
    }
}

impl FromStr for BackendType {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "power_of_two" | "pow2" => Ok(BackendType::PowerOfTwo),
            "even" => Ok(BackendType::Even),
            other => Err(SpectralError::Unavailable(format!(
                "unknown spectral backend '{other}' (expected 'power_of_two' or 'even')"
            ))),
        }
    }
}

/// Abstraction over real-input FFT engines.
///
/// Implementations follow the numpy conventions: `rfftn(x, s)` zero-pads or
/// crops `x` at the far end of every axis to `s` and keeps `s[last] / 2 + 1`
/// bins along the last axis; `irfftn(X, s)` inverts that and normalises by the
/// total number of samples.
pub trait SpectralBackend: Send + Sync {
    /// The padding policy this backend implements.
    fn backend_type(&self) -> BackendType;

    /// Padded length for an axis of original length `len`.
    fn padded_len(&self, len: usize) -> usize {
        self.backend_type().padded_len(len)
    }

    /// Padded shape used for a linear convolution over a grid of shape `dim`.
    fn padded_shape(&self, dim: &[usize]) -> Vec<usize> {
        dim.iter().map(|&len| self.padded_len(len)).collect()
    }

    /// Forward real-to-complex transform over `shape`.
    fn rfftn(
        &self,
        input: ArrayViewD<'_, f64>,
        shape: &[usize],
    ) -> Result<ArrayD<Complex64>, SpectralError>;

    /// Inverse complex-to-real transform producing an array of `shape`.
    fn irfftn(
        &self,
        spectrum: ArrayViewD<'_, Complex64>,
        shape: &[usize],
    ) -> Result<ArrayD<f64>, SpectralError>;

    /// Allocate a zero-initialised real buffer, e.g. the padded input of a
    /// convolution.
    fn zeros(&self, shape: &[usize]) -> ArrayD<f64> {
        ArrayD::zeros(IxDyn(shape))
    }
}

/// Instantiate the backend for a given padding policy.
///
/// Fails with [`SpectralError::Unavailable`] if the backend was compiled out
/// via its feature flag.
pub fn create_backend(kind: BackendType) -> Result<Arc<dyn SpectralBackend>, SpectralError> {
    log::debug!("Creating spectral backend '{}'", kind);
    match kind {
        #[cfg(feature = "pow2")]
        BackendType::PowerOfTwo => Ok(Arc::new(crate::pow2::PowerOfTwoBackend::new())),
        #[cfg(feature = "even")]
        BackendType::Even => Ok(Arc::new(crate::even::EvenBackend::new())),
        #[allow(unreachable_patterns)]
        other => Err(SpectralError::Unavailable(format!(
            "backend '{other}' was not compiled in (enable the corresponding feature)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_len_policies() {
        assert_eq!(BackendType::PowerOfTwo.padded_len(5), 16);
        assert_eq!(BackendType::PowerOfTwo.padded_len(4), 8);
        assert_eq!(BackendType::PowerOfTwo.padded_len(1), 2);
        assert_eq!(BackendType::Even.padded_len(5), 10);
        assert_eq!(BackendType::Even.padded_len(1), 2);
    }

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!("pow2".parse::<BackendType>().unwrap(), BackendType::PowerOfTwo);
        assert_eq!("Power_Of_Two".parse::<BackendType>().unwrap(), BackendType::PowerOfTwo);
        assert_eq!(" even ".parse::<BackendType>().unwrap(), BackendType::Even);

        let err = "fftw".parse::<BackendType>().unwrap_err();
        assert!(matches!(err, SpectralError::Unavailable(_)));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for kind in [BackendType::PowerOfTwo, BackendType::Even] {
            assert_eq!(kind.to_string().parse::<BackendType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_zeros_matches_padded_shape() {
        let backend = create_backend(BackendType::Even).unwrap();
        let pad = backend.padded_shape(&[2, 3]);
        let buffer = backend.zeros(&pad);
        assert_eq!(buffer.shape(), &[4, 6]);
        assert!(buffer.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_create_backend_reports_policy() {
        let pow2 = create_backend(BackendType::PowerOfTwo).unwrap();
        assert_eq!(pow2.backend_type(), BackendType::PowerOfTwo);
        assert_eq!(pow2.padded_shape(&[3, 5, 6]), vec![8, 16, 16]);

        let even = create_backend(BackendType::Even).unwrap();
        assert_eq!(even.backend_type(), BackendType::Even);
        assert_eq!(even.padded_shape(&[3, 5, 6]), vec![6, 10, 12]);
    }
}
