//! Power-of-two padding backend.
//!
//! Every axis is padded to the smallest power of two that is at least twice
//! the original extent. A fresh planner is built per call, so the backend
//! carries no library state between invocations.

use ndarray::{ArrayD, ArrayViewD};
use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::backend::{BackendType, SpectralBackend, SpectralError};
use crate::transform;

/// Stateless backend padding to powers of two.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerOfTwoBackend;

impl PowerOfTwoBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SpectralBackend for PowerOfTwoBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::PowerOfTwo
    }

    fn rfftn(
        &self,
        input: ArrayViewD<'_, f64>,
        shape: &[usize],
    ) -> Result<ArrayD<Complex64>, SpectralError> {
        let mut planner = FftPlanner::new();
        transform::forward_real(&mut planner, input, shape)
    }

    fn irfftn(
        &self,
        spectrum: ArrayViewD<'_, Complex64>,
        shape: &[usize],
    ) -> Result<ArrayD<f64>, SpectralError> {
        let mut planner = FftPlanner::new();
        transform::inverse_real(&mut planner, spectrum, shape)
    }
}
