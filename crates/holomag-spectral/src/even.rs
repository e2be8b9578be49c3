//! Even padding backend with a shared plan cache.
//!
//! Every axis is padded to exactly twice its original extent, which is the
//! smallest even length that still avoids circular wrap-around in a linear
//! convolution with a `2n - 1` kernel.
//!
//! # Plan caching
//!
//! FFT plans are kept in a single planner behind a mutex and reused across
//! calls, so repeated convolutions over the same geometry skip planning. The
//! lock is held for the whole transform; the backend is `Sync` and can be
//! shared between threads, which then serialise on the planner.

use std::sync::Mutex;

use ndarray::{ArrayD, ArrayViewD};
use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::backend::{BackendType, SpectralBackend, SpectralError};
use crate::transform;

/// Backend padding to `2 * len` with cached FFT plans.
pub struct EvenBackend {
    planner: Mutex<FftPlanner<f64>>,
}

impl EvenBackend {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }
}

impl Default for EvenBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralBackend for EvenBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Even
    }

    fn rfftn(
        &self,
        input: ArrayViewD<'_, f64>,
        shape: &[usize],
    ) -> Result<ArrayD<Complex64>, SpectralError> {
        let mut planner = self
            .planner
            .lock()
            .map_err(|_| SpectralError::PlannerPoisoned)?;
        transform::forward_real(&mut planner, input, shape)
    }

    fn irfftn(
        &self,
        spectrum: ArrayViewD<'_, Complex64>,
        shape: &[usize],
    ) -> Result<ArrayD<f64>, SpectralError> {
        let mut planner = self
            .planner
            .lock()
            .map_err(|_| SpectralError::PlannerPoisoned)?;
        transform::inverse_real(&mut planner, spectrum, shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow2::PowerOfTwoBackend;
    use approx::assert_abs_diff_eq;
    use ndarray::{s, Array2, ArrayD, IxDyn};
    use std::sync::Arc;

    /// Linear convolution of two 2-D arrays via a backend, cropped to `a`'s shape
    /// with the same `[n-1, 2n-1)` window the field converter uses.
    fn convolve_centred(backend: &dyn SpectralBackend, a: &Array2<f64>, k: &Array2<f64>) -> Array2<f64> {
        let dim = [a.nrows(), a.ncols()];
        let pad = backend.padded_shape(&dim);
        let fa = backend.rfftn(a.view().into_dyn(), &pad).unwrap();
        let fk = backend.rfftn(k.view().into_dyn(), &pad).unwrap();
        let prod: ArrayD<Complex64> = &fa * &fk;
        let full = backend.irfftn(prod.view(), &pad).unwrap();
        full.slice(s![dim[0] - 1..2 * dim[0] - 1, dim[1] - 1..2 * dim[1] - 1])
            .to_owned()
    }

    #[test]
    fn test_even_and_pow2_give_same_linear_convolution() {
        let a = Array2::from_shape_fn((5, 3), |(j, i)| ((j * 3 + i) as f64).cos());
        let k = Array2::from_shape_fn((9, 5), |(j, i)| {
            let y = j as f64 - 4.0;
            let x = i as f64 - 2.0;
            y / (x * x + y * y + 1e-30)
        });

        let even = convolve_centred(&EvenBackend::new(), &a, &k);
        let pow2 = convolve_centred(&PowerOfTwoBackend::new(), &a, &k);

        for (e, p) in even.iter().zip(pow2.iter()) {
            assert_abs_diff_eq!(*e, *p, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_shared_backend_across_threads() {
        let backend = Arc::new(EvenBackend::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let backend = Arc::clone(&backend);
                std::thread::spawn(move || {
                    let data = ArrayD::from_shape_fn(IxDyn(&[4, 6]), |idx| (idx[0] * 6 + idx[1] + t) as f64);
                    let spectrum = backend.rfftn(data.view(), &[8, 12]).unwrap();
                    let back = backend.irfftn(spectrum.view(), &[8, 12]).unwrap();
                    back[[3, 5].as_slice()] - data[[3, 5].as_slice()]
                })
            })
            .collect();

        for handle in handles {
            let diff = handle.join().unwrap();
            assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-12);
        }
    }
}
