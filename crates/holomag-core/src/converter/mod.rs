//! Conversion of a magnetization distribution into its vector potential and
//! B-field.
//!
//! The vector potential is the convolution $\mathbf{A} = \mathbf{M} \ast \mathbf{K}$
//! of the magnetization with the [`DipoleKernel`], evaluated as a cross product
//! in Fourier space. The B-field is the finite-difference curl of $\mathbf{A}$.

pub mod curl;
pub mod dipole;

use std::fmt;
use std::sync::Arc;

use holomag_spectral::SpectralBackend;
use ndarray::{Array3, ArrayD, Ix3, Slice};
use num_complex::Complex64;

use crate::config::PipelineConfig;
use crate::error::{HoloError, Result};
use crate::types::VectorField;

pub use dipole::DipoleKernel;

/// Converts magnetization into vector potential and B-field using an
/// injected spectral backend.
#[derive(Clone)]
pub struct FieldConverter {
    backend: Arc<dyn SpectralBackend>,
}

impl fmt::Debug for FieldConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConverter")
            .field("backend", &self.backend.backend_type())
            .finish()
    }
}

impl FieldConverter {
    pub fn new(backend: Arc<dyn SpectralBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(config.backend()?))
    }

    pub fn backend(&self) -> &Arc<dyn SpectralBackend> {
        &self.backend
    }

    /// Vector potential of `mag` for saturation induction `b_0`.
    ///
    /// The result lives on the same grid and spacing as `mag`.
    pub fn convert_m_to_a(&self, mag: &VectorField, b_0: f64) -> Result<VectorField> {
        log::debug!("Calling convert_m_to_a");
        let dim = mag.dim();
        let kernel = DipoleKernel::new(dim, mag.a(), b_0)?;
        let pad = self.backend.padded_shape(&dim);

        let k_fft = kernel
            .components()
            .iter()
            .map(|k| self.backend.rfftn(k.view().into_dyn(), &pad))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        // M sits at the low corner of the zero-padded buffer.
        let m_fft = (0..3)
            .map(|c| {
                let mut buffer = self.backend.zeros(&pad);
                buffer
                    .slice_each_axis_mut(|ax| Slice::from(0..dim[ax.axis.index()]))
                    .assign(&mag.component(c).into_dyn());
                self.backend.rfftn(buffer.view(), &pad)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let cross = |p: usize, q: usize| -> ArrayD<Complex64> {
            &m_fft[p] * &k_fft[q] - &m_fft[q] * &k_fft[p]
        };
        let a_fft = [cross(1, 2), cross(2, 0), cross(0, 1)];

        let mut components = Vec::with_capacity(3);
        for spectrum in &a_fft {
            let full = self.backend.irfftn(spectrum.view(), &pad)?;
            components.push(crop_to_grid(&full, dim)?);
        }
        let [a_x, a_y, a_z]: [Array3<f64>; 3] = components
            .try_into()
            .map_err(|_| HoloError::InvalidInput("expected three components".into()))?;

        let a_field = VectorField::from_components(mag.a(), [a_x, a_y, a_z])?;
        ensure_finite(&a_field, "vector potential")?;
        Ok(a_field)
    }

    /// B-field as the discrete curl of a vector potential.
    pub fn convert_a_to_b(&self, a_field: &VectorField) -> Result<VectorField> {
        log::debug!("Calling convert_a_to_b");
        let components = [
            a_field.component(0),
            a_field.component(1),
            a_field.component(2),
        ];
        let b_field = VectorField::from_components(a_field.a(), curl::curl(components))?;
        ensure_finite(&b_field, "B-field")?;
        Ok(b_field)
    }

    /// B-field of `mag`, i.e. `convert_a_to_b(convert_m_to_a(mag, b_0))`.
    pub fn convert_m_to_b(&self, mag: &VectorField, b_0: f64) -> Result<VectorField> {
        log::debug!("Calling convert_m_to_b");
        self.convert_a_to_b(&self.convert_m_to_a(mag, b_0)?)
    }
}

/// Cut `[d-1, 2d-1)` out of every axis of a convolution result, undoing the
/// offset of the kernel centre.
fn crop_to_grid(full: &ArrayD<f64>, dim: [usize; 3]) -> Result<Array3<f64>> {
    full.slice_each_axis(|ax| {
        let d = dim[ax.axis.index()];
        Slice::from(d - 1..2 * d - 1)
    })
    .to_owned()
    .into_dimensionality::<Ix3>()
    .map_err(|e| HoloError::InvalidInput(e.to_string()))
}

fn ensure_finite(field: &VectorField, what: &str) -> Result<()> {
    if field.field().iter().any(|v| !v.is_finite()) {
        return Err(HoloError::NumericalDegeneracy(format!(
            "{what} contains non-finite values"
        )));
    }
    Ok(())
}
