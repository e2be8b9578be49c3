//! Projected phase kernel.
//!
//! The phase contribution of one pixel of projected magnetization
//! $(M_u, M_v)$ at pixel displacement $(n, m)$ is
//! $M_u\,u(n, m) - M_v\,v(n, m)$ with prefactor
//! $c = B_0 a^2 / (2 \Phi_0)$. Two pixel models are available:
//!
//! - **Disc**: each pixel is a cylinder, $u = c\,m / (n^2 + m^2)$,
//!   $v = c\,n / (n^2 + m^2)$, zero at the origin.
//! - **Slab**: each pixel is a square prism, integrated in closed form over
//!   the pixel area.

use std::fmt;
use std::sync::Arc;

use holomag_spectral::SpectralBackend;
use ndarray::{s, Array2, ArrayD, ArrayView2, Ix2, Slice};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{HoloError, Result};
use crate::types::PHI_0;

/// Pixel model of the projected kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelGeometry {
    #[default]
    Disc,
    Slab,
}

fn disc_element(n: f64, m: f64) -> f64 {
    if n == 0.0 && m == 0.0 {
        return 0.0;
    }
    m / (n * n + m * m + 1e-30)
}

fn slab_element(n: f64, m: f64, a: f64) -> f64 {
    let f = |n: f64, m: f64| {
        n * (a * a * (n * n + m * m)).ln() - 2.0 * n + 2.0 * m * (n / m).atan()
    };
    0.5 * (f(n - 0.5, m - 0.5) - f(n + 0.5, m - 0.5) - f(n - 0.5, m + 0.5) + f(n + 0.5, m + 0.5))
}

/// Real-space `u` and `v` kernels of shape `(2V-1, 2U-1)` together with the
/// spectra used for convolution and its adjoint.
pub struct PhaseKernel {
    a: f64,
    dim_uv: (usize, usize),
    b_0: f64,
    geometry: KernelGeometry,
    u: Array2<f64>,
    v: Array2<f64>,
    dim_pad: Vec<usize>,
    u_fft: ArrayD<Complex64>,
    v_fft: ArrayD<Complex64>,
    u_flip_fft: ArrayD<Complex64>,
    v_flip_fft: ArrayD<Complex64>,
    backend: Arc<dyn SpectralBackend>,
}

impl fmt::Debug for PhaseKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseKernel")
            .field("a", &self.a)
            .field("dim_uv", &self.dim_uv)
            .field("b_0", &self.b_0)
            .field("geometry", &self.geometry)
            .field("dim_pad", &self.dim_pad)
            .field("backend", &self.backend.backend_type())
            .finish()
    }
}

impl PhaseKernel {
    pub fn new(
        a: f64,
        dim_uv: (usize, usize),
        b_0: f64,
        geometry: KernelGeometry,
        backend: Arc<dyn SpectralBackend>,
    ) -> Result<Self> {
        if !(a.is_finite() && a > 0.0) {
            return Err(HoloError::InvalidInput(format!(
                "grid spacing must be positive and finite, got {a}"
            )));
        }
        if !b_0.is_finite() {
            return Err(HoloError::InvalidInput(format!("b_0 must be finite, got {b_0}")));
        }
        let (dim_v, dim_u) = dim_uv;
        if dim_v == 0 || dim_u == 0 {
            return Err(HoloError::InvalidInput(format!(
                "phase kernel needs a non-empty image, got {dim_uv:?}"
            )));
        }
        log::debug!("Calling PhaseKernel::new ({geometry:?}, {dim_uv:?})");

        let coeff = b_0 * a * a / (2.0 * PHI_0);
        let shape = (2 * dim_v - 1, 2 * dim_u - 1);
        let (off_v, off_u) = (dim_v as f64 - 1.0, dim_u as f64 - 1.0);
        let element = |n: f64, m: f64| match geometry {
            KernelGeometry::Disc => disc_element(n, m),
            KernelGeometry::Slab => slab_element(n, m, a),
        };
        let u = Array2::from_shape_fn(shape, |(jj, ii)| {
            let (n, m) = (ii as f64 - off_u, jj as f64 - off_v);
            coeff * element(n, m)
        });
        let v = Array2::from_shape_fn(shape, |(jj, ii)| {
            let (n, m) = (ii as f64 - off_u, jj as f64 - off_v);
            coeff * element(m, n)
        });

        let dim_pad = backend.padded_shape(&[dim_v, dim_u]);
        let spectrum = |k: ArrayView2<'_, f64>| backend.rfftn(k.into_dyn(), &dim_pad);
        let u_fft = spectrum(u.view())?;
        let v_fft = spectrum(v.view())?;
        let u_flip_fft = spectrum(u.slice(s![..;-1, ..;-1]))?;
        let v_flip_fft = spectrum(v.slice(s![..;-1, ..;-1]))?;

        Ok(Self {
            a,
            dim_uv,
            b_0,
            geometry,
            u,
            v,
            dim_pad,
            u_fft,
            v_fft,
            u_flip_fft,
            v_flip_fft,
            backend,
        })
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn dim_uv(&self) -> (usize, usize) {
        self.dim_uv
    }

    pub fn b_0(&self) -> f64 {
        self.b_0
    }

    pub fn geometry(&self) -> KernelGeometry {
        self.geometry
    }

    /// Real-space `u` kernel; index `(V-1, U-1)` is zero displacement.
    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    /// Real-space `v` kernel.
    pub fn v(&self) -> &Array2<f64> {
        &self.v
    }

    pub fn dim_pad(&self) -> &[usize] {
        &self.dim_pad
    }

    /// Linear convolution of an image with one of the kernel spectra, cropped
    /// back onto the image grid.
    fn convolve(&self, image: ArrayView2<'_, f64>, kernel_fft: &ArrayD<Complex64>) -> Result<Array2<f64>> {
        let image_fft = self.backend.rfftn(image.into_dyn(), &self.dim_pad)?;
        let product = image_fft * kernel_fft;
        let full = self.backend.irfftn(product.view(), &self.dim_pad)?;
        let dims = [self.dim_uv.0, self.dim_uv.1];
        full.slice_each_axis(|ax| {
            let d = dims[ax.axis.index()];
            Slice::from(d - 1..2 * d - 1)
        })
        .to_owned()
        .into_dimensionality::<Ix2>()
        .map_err(|e| HoloError::InvalidInput(e.to_string()))
    }

    /// `M_u * u - M_v * v`.
    pub(crate) fn convolve_forward(
        &self,
        u_mag: ArrayView2<'_, f64>,
        v_mag: ArrayView2<'_, f64>,
    ) -> Result<Array2<f64>> {
        Ok(self.convolve(u_mag, &self.u_fft)? - self.convolve(v_mag, &self.v_fft)?)
    }

    /// Adjoint of [`PhaseKernel::convolve_forward`]: correlation with both kernels.
    pub(crate) fn convolve_adjoint(&self, phase: ArrayView2<'_, f64>) -> Result<(Array2<f64>, Array2<f64>)> {
        let u_part = self.convolve(phase, &self.u_flip_fft)?;
        let v_part = -self.convolve(phase, &self.v_flip_fft)?;
        Ok((u_part, v_part))
    }
}
