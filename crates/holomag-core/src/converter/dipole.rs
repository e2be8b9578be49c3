//! Dipole convolution kernel for the magnetization to vector potential step.
//!
//! For a displacement $\mathbf{r} = (x, y, z)$ in cell units the kernel is
//!
//! $$
//! \mathbf{K}(\mathbf{r}) = \frac{a B_0}{4\pi} \frac{\mathbf{r}}{(|\mathbf{r}|^2 + 10^{-30})^{3/2}}
//! $$
//!
//! so that $\mathbf{A} = \sum_{\mathbf{r}'} \mathbf{M}(\mathbf{r}') \times \mathbf{K}(\mathbf{r} - \mathbf{r}')$.

use std::f64::consts::PI;

use ndarray::{Array3, Zip};

use crate::error::{HoloError, Result};

/// Regulariser added to $|\mathbf{r}|^2$ so the origin evaluates to zero.
pub const KERNEL_EPS: f64 = 1e-30;

/// The three Cartesian kernel components over all displacements of a grid.
///
/// Each component has shape `(2Z-1, 2Y-1, 2X-1)`; index `(Z-1, Y-1, X-1)` is
/// zero displacement.
#[derive(Debug, Clone)]
pub struct DipoleKernel {
    dim: [usize; 3],
    a: f64,
    b_0: f64,
    components: [Array3<f64>; 3],
}

impl DipoleKernel {
    pub fn new(dim: [usize; 3], a: f64, b_0: f64) -> Result<Self> {
        if dim.contains(&0) {
            return Err(HoloError::InvalidInput(format!(
                "kernel grid must be non-empty, got {dim:?}"
            )));
        }
        if !(a.is_finite() && a > 0.0) {
            return Err(HoloError::InvalidInput(format!(
                "grid spacing must be positive and finite, got {a}"
            )));
        }
        if !b_0.is_finite() {
            return Err(HoloError::InvalidInput(format!("b_0 must be finite, got {b_0}")));
        }

        let coeff = a * b_0 / (4.0 * PI);
        let shape = (2 * dim[0] - 1, 2 * dim[1] - 1, 2 * dim[2] - 1);
        let offset = [dim[0] as f64 - 1.0, dim[1] as f64 - 1.0, dim[2] as f64 - 1.0];

        let mut k_x = Array3::zeros(shape);
        let mut k_y = Array3::zeros(shape);
        let mut k_z = Array3::zeros(shape);
        Zip::indexed(&mut k_x)
            .and(&mut k_y)
            .and(&mut k_z)
            .par_for_each(|(k, j, i), kx, ky, kz| {
                let z = k as f64 - offset[0];
                let y = j as f64 - offset[1];
                let x = i as f64 - offset[2];
                let denom = (x * x + y * y + z * z + KERNEL_EPS).powf(1.5);
                *kx = coeff * x / denom;
                *ky = coeff * y / denom;
                *kz = coeff * z / denom;
            });

        Ok(Self {
            dim,
            a,
            b_0,
            components: [k_x, k_y, k_z],
        })
    }

    /// Grid shape `(Z, Y, X)` the kernel was built for.
    pub fn dim(&self) -> [usize; 3] {
        self.dim
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b_0(&self) -> f64 {
        self.b_0
    }

    /// Kernel shape `(2Z-1, 2Y-1, 2X-1)`.
    pub fn dim_kern(&self) -> [usize; 3] {
        self.dim.map(|d| 2 * d - 1)
    }

    /// Index of zero displacement.
    pub fn center(&self) -> [usize; 3] {
        self.dim.map(|d| d - 1)
    }

    /// The x, y and z components.
    pub fn components(&self) -> &[Array3<f64>; 3] {
        &self.components
    }
}
