//! Magnetization reconstruction from phase maps.
//!
//! The reconstruction minimises the [`Costfunction`]. Because the forward
//! model is linear the minimum solves the normal equations
//!
//! $$
//! (F^T W F + \lambda I)\, x = F^T W y
//! $$
//!
//! which [`optimize_linear`] hands to [`conjugate_gradient`].

pub mod cg;
pub mod costfunction;

use crate::config::ReconstructionConfig;
use crate::error::{HoloError, Result};
use crate::forward_model::ForwardModel;
use crate::types::VectorField;

pub use cg::{conjugate_gradient, CgOutcome};
pub use costfunction::Costfunction;

/// Result of a reconstruction run.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Reconstructed magnetization; zero outside the dataset mask.
    pub mag_data: VectorField,
    pub iterations: usize,
    /// Final CG residual relative to `||F^T W y||`.
    pub residual: f64,
    pub converged: bool,
    /// Cost of the returned magnetization.
    pub cost: f64,
}

/// Reconstruct the magnetization of a dataset by conjugate gradients on the
/// normal equations, starting from zero.
pub fn optimize_linear(
    fwd_model: &ForwardModel,
    config: &ReconstructionConfig,
) -> Result<Reconstruction> {
    if config.max_iter == 0 || !(config.tolerance.is_finite() && config.tolerance > 0.0) {
        return Err(HoloError::Configuration(format!(
            "invalid reconstruction settings: max_iter = {}, tolerance = {}",
            config.max_iter, config.tolerance
        )));
    }
    let cost = Costfunction::new(fwd_model, config.lambda)?;
    log::info!(
        "Starting reconstruction: n = {}, m = {}, lambda = {:e}",
        fwd_model.n(),
        fwd_model.m(),
        config.lambda
    );

    let rhs = cost.rhs()?;
    let outcome = conjugate_gradient(
        |v| {
            let mut hv = cost.hess_dot(None, v)?;
            hv.iter_mut().for_each(|h| *h *= 0.5);
            Ok(hv)
        },
        &rhs,
        config.tolerance,
        config.max_iter,
    )?;

    let final_cost = cost.call(&outcome.x)?;
    if outcome.converged {
        log::info!(
            "Reconstruction converged after {} iterations (residual {:.3e}, cost {:.6e})",
            outcome.iterations,
            outcome.residual,
            final_cost
        );
    } else {
        log::warn!(
            "Reconstruction stopped after {} iterations without reaching tolerance {:e} (residual {:.3e})",
            outcome.iterations,
            config.tolerance,
            outcome.residual
        );
    }

    Ok(Reconstruction {
        mag_data: fwd_model.to_vector_field(&outcome.x)?,
        iterations: outcome.iterations,
        residual: outcome.residual,
        converged: outcome.converged,
        cost: final_cost,
    })
}
