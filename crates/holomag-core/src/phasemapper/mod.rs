//! Phase mappers: projected magnetization to holography phase.
//!
//! All mappers implement [`PhaseMapper`], a linear operator from the stacked
//! `(u, v)` projected magnetization (length `2UV`) to a phase image (length
//! `UV`), together with its transpose.
//!
//! - [`RdfcMapper`] convolves with the real-space [`PhaseKernel`] in Fourier space.
//! - [`RdrcMapper`] performs the same convolution by direct summation. It is
//!   slow and exists as the exact reference.

pub mod kernel;

use std::sync::Arc;

use ndarray::{s, Array2, ArrayView2, Zip};

use crate::error::{check_len, HoloError, Result};
use crate::types::{PhaseMap, VectorField};

pub use kernel::{KernelGeometry, PhaseKernel};

/// A linear map from projected magnetization to phase.
pub trait PhaseMapper: Send + Sync {
    /// Image shape `(V, U)`.
    fn dim_uv(&self) -> (usize, usize);

    /// Grid spacing (nm).
    fn a(&self) -> f64;

    /// `2UV` projected magnetization to a `UV` phase vector.
    fn jac_dot(&self, vector: &[f64]) -> Result<Vec<f64>>;

    /// `UV` phase vector to `2UV` projected magnetization.
    fn jac_t_dot(&self, vector: &[f64]) -> Result<Vec<f64>>;

    /// Phase map of a projected field of grid `(1, V, U)`.
    fn map(&self, projected: &VectorField) -> Result<PhaseMap> {
        let (dim_v, dim_u) = self.dim_uv();
        if projected.dim() != [1, dim_v, dim_u] {
            return Err(HoloError::InvalidInput(format!(
                "projected field grid {:?} does not match mapper image {:?}",
                projected.dim(),
                (dim_v, dim_u)
            )));
        }
        if (projected.a() - self.a()).abs() > 1e-12 * self.a() {
            return Err(HoloError::InvalidInput(format!(
                "projected field spacing {} does not match mapper spacing {}",
                projected.a(),
                self.a()
            )));
        }
        let flat = projected.to_flat();
        let phase = self.jac_dot(&flat[..2 * dim_v * dim_u])?;
        let phase = Array2::from_shape_vec((dim_v, dim_u), phase)
            .map_err(|e| HoloError::InvalidInput(e.to_string()))?;
        PhaseMap::new(self.a(), phase)
    }
}

fn image_view(values: &[f64], dim_uv: (usize, usize)) -> Result<ArrayView2<'_, f64>> {
    ArrayView2::from_shape(dim_uv, values).map_err(|e| HoloError::InvalidInput(e.to_string()))
}

/// Split a stacked `(u, v)` vector into two image views.
fn split_uv(vector: &[f64], dim_uv: (usize, usize)) -> Result<(ArrayView2<'_, f64>, ArrayView2<'_, f64>)> {
    let size = dim_uv.0 * dim_uv.1;
    Ok((image_view(&vector[..size], dim_uv)?, image_view(&vector[size..], dim_uv)?))
}

fn stack_uv(u_part: Array2<f64>, v_part: Array2<f64>) -> Vec<f64> {
    u_part.iter().chain(v_part.iter()).copied().collect()
}

/// Real-space kernel, Fourier-space convolution.
#[derive(Debug)]
pub struct RdfcMapper {
    kernel: Arc<PhaseKernel>,
}

impl RdfcMapper {
    pub fn new(kernel: Arc<PhaseKernel>) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Arc<PhaseKernel> {
        &self.kernel
    }
}

impl PhaseMapper for RdfcMapper {
    fn dim_uv(&self) -> (usize, usize) {
        self.kernel.dim_uv()
    }

    fn a(&self) -> f64 {
        self.kernel.a()
    }

    fn jac_dot(&self, vector: &[f64]) -> Result<Vec<f64>> {
        let dim_uv = self.dim_uv();
        check_len("RdfcMapper::jac_dot", 2 * dim_uv.0 * dim_uv.1, vector.len())?;
        let (u_mag, v_mag) = split_uv(vector, dim_uv)?;
        let phase = self.kernel.convolve_forward(u_mag, v_mag)?;
        Ok(phase.iter().copied().collect())
    }

    fn jac_t_dot(&self, vector: &[f64]) -> Result<Vec<f64>> {
        let dim_uv = self.dim_uv();
        check_len("RdfcMapper::jac_t_dot", dim_uv.0 * dim_uv.1, vector.len())?;
        let phase = image_view(vector, dim_uv)?;
        let (u_part, v_part) = self.kernel.convolve_adjoint(phase)?;
        Ok(stack_uv(u_part, v_part))
    }
}

/// Real-space kernel, real-space convolution.
#[derive(Debug)]
pub struct RdrcMapper {
    kernel: Arc<PhaseKernel>,
}

impl RdrcMapper {
    pub fn new(kernel: Arc<PhaseKernel>) -> Self {
        Self { kernel }
    }

    /// Kernel windows seen by the source pixel `(q, p)`.
    fn windows(&self, q: usize, p: usize) -> (ArrayView2<'_, f64>, ArrayView2<'_, f64>) {
        let (dim_v, dim_u) = self.dim_uv();
        let rows = dim_v - 1 - q..2 * dim_v - 1 - q;
        let cols = dim_u - 1 - p..2 * dim_u - 1 - p;
        (
            self.kernel.u().slice(s![rows.clone(), cols.clone()]),
            self.kernel.v().slice(s![rows, cols]),
        )
    }
}

impl PhaseMapper for RdrcMapper {
    fn dim_uv(&self) -> (usize, usize) {
        self.kernel.dim_uv()
    }

    fn a(&self) -> f64 {
        self.kernel.a()
    }

    fn jac_dot(&self, vector: &[f64]) -> Result<Vec<f64>> {
        let dim_uv = self.dim_uv();
        check_len("RdrcMapper::jac_dot", 2 * dim_uv.0 * dim_uv.1, vector.len())?;
        let (u_mag, v_mag) = split_uv(vector, dim_uv)?;
        let mut phase = Array2::zeros(dim_uv);
        for (((q, p), &mu), &mv) in u_mag.indexed_iter().zip(v_mag.iter()) {
            if mu == 0.0 && mv == 0.0 {
                continue;
            }
            let (u_win, v_win) = self.windows(q, p);
            Zip::from(&mut phase)
                .and(&u_win)
                .and(&v_win)
                .for_each(|ph, &ku, &kv| *ph += mu * ku - mv * kv);
        }
        Ok(phase.iter().copied().collect())
    }

    fn jac_t_dot(&self, vector: &[f64]) -> Result<Vec<f64>> {
        let dim_uv = self.dim_uv();
        check_len("RdrcMapper::jac_t_dot", dim_uv.0 * dim_uv.1, vector.len())?;
        let phase = image_view(vector, dim_uv)?;
        let mut u_part = Array2::zeros(dim_uv);
        let mut v_part = Array2::zeros(dim_uv);
        for ((q, p), u_out) in u_part.indexed_iter_mut() {
            let (u_win, v_win) = self.windows(q, p);
            *u_out = (&phase * &u_win).sum();
            v_part[[q, p]] = -(&phase * &v_win).sum();
        }
        Ok(stack_uv(u_part, v_part))
    }
}
