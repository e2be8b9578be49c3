//! TOML configuration for a mapping pipeline.
//!
//! A [`PipelineConfig`] is parsed once, validated, and then handed to the
//! components that need it. Nothing in the pipeline reads global state.

use std::path::Path;
use std::sync::Arc;

use holomag_spectral::{create_backend, BackendType, SpectralBackend};
use serde::{Deserialize, Serialize};

use crate::error::{HoloError, Result};
use crate::phasemapper::KernelGeometry;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Saturation induction (T).
    #[serde(default = "default_b_0")]
    pub b_0: f64,
    /// Pixel model of the projected phase kernel.
    #[serde(default)]
    pub kernel_geometry: KernelGeometry,
    #[serde(default)]
    pub spectral: SpectralConfig,
    #[serde(default)]
    pub reconstruction: ReconstructionConfig,
}

/// Spectral backend selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// "power_of_two" (alias "pow2") or "even". Default: "even".
    #[serde(default)]
    pub backend: BackendType,
}

/// Tikhonov-regularised reconstruction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Relative residual at which conjugate gradients stop.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            b_0: default_b_0(),
            kernel_geometry: KernelGeometry::default(),
            spectral: SpectralConfig::default(),
            reconstruction: ReconstructionConfig::default(),
        }
    }
}

fn default_b_0() -> f64 {
    1.0
}
fn default_lambda() -> f64 {
    1e-4
}
fn default_max_iter() -> usize {
    100
}
fn default_tolerance() -> f64 {
    1e-9
}

impl PipelineConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(content).map_err(|e| HoloError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        log::debug!("Loading pipeline configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Serialise back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| HoloError::Configuration(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.b_0.is_finite() {
            return Err(HoloError::Configuration(format!(
                "b_0 must be finite, got {}",
                self.b_0
            )));
        }
        let rec = &self.reconstruction;
        if !(rec.lambda.is_finite() && rec.lambda >= 0.0) {
            return Err(HoloError::Configuration(format!(
                "reconstruction.lambda must be non-negative, got {}",
                rec.lambda
            )));
        }
        if rec.max_iter == 0 {
            return Err(HoloError::Configuration(
                "reconstruction.max_iter must be positive".into(),
            ));
        }
        if !(rec.tolerance.is_finite() && rec.tolerance > 0.0) {
            return Err(HoloError::Configuration(format!(
                "reconstruction.tolerance must be positive, got {}",
                rec.tolerance
            )));
        }
        Ok(())
    }

    /// Instantiate the configured spectral backend.
    ///
    /// A backend that was compiled out is reported as a configuration error.
    pub fn backend(&self) -> Result<Arc<dyn SpectralBackend>> {
        create_backend(self.spectral.backend).map_err(|e| HoloError::Configuration(e.to_string()))
    }
}
