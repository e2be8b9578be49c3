//! Tikhonov-regularised least-squares cost of a forward model.
//!
//! $$
//! C(x) = (F x - y)^T W (F x - y) + \lambda \|x\|^2
//! $$
//!
//! where $W$ is the diagonal of per-pixel phase map confidences.

use crate::error::{check_len, HoloError, Result};
use crate::forward_model::ForwardModel;

use super::cg::dot;

/// Cost of a magnetization vector against the measured phase of a dataset.
#[derive(Debug)]
pub struct Costfunction<'a> {
    fwd_model: &'a ForwardModel,
    y: Vec<f64>,
    weights: Vec<f64>,
    lambda: f64,
}

impl<'a> Costfunction<'a> {
    pub fn new(fwd_model: &'a ForwardModel, lambda: f64) -> Result<Self> {
        if !(lambda.is_finite() && lambda >= 0.0) {
            return Err(HoloError::InvalidInput(format!(
                "regularisation weight must be non-negative, got {lambda}"
            )));
        }
        Ok(Self {
            fwd_model,
            y: fwd_model.data_set().phase_vec(),
            weights: fwd_model.data_set().confidence_vec(),
            lambda,
        })
    }

    pub fn n(&self) -> usize {
        self.fwd_model.n()
    }

    /// Measured phase vector.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Stacked confidence of every phase pixel.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    fn weight(&self, mut vector: Vec<f64>) -> Vec<f64> {
        for (v, w) in vector.iter_mut().zip(&self.weights) {
            *v *= w;
        }
        vector
    }

    /// Right-hand side `F^T W y` of the normal equations.
    pub fn rhs(&self) -> Result<Vec<f64>> {
        self.fwd_model.jac_t_dot(None, &self.weight(self.y.clone()))
    }

    fn residual(&self, x: &[f64]) -> Result<Vec<f64>> {
        let mut residual = self.fwd_model.evaluate(x)?;
        for (r, y) in residual.iter_mut().zip(&self.y) {
            *r -= y;
        }
        Ok(residual)
    }

    /// `(F x - y)^T W (F x - y) + lambda ||x||^2`.
    pub fn call(&self, x: &[f64]) -> Result<f64> {
        let residual = self.residual(x)?;
        let weighted = self.weight(residual.clone());
        Ok(dot(&residual, &weighted) + self.lambda * dot(x, x))
    }

    /// Gradient `2 F^T W (F x - y) + 2 lambda x`.
    pub fn jac(&self, x: &[f64]) -> Result<Vec<f64>> {
        let residual = self.weight(self.residual(x)?);
        let mut grad = self.fwd_model.jac_t_dot(Some(x), &residual)?;
        for (g, xi) in grad.iter_mut().zip(x) {
            *g = 2.0 * *g + 2.0 * self.lambda * xi;
        }
        Ok(grad)
    }

    /// Hessian product `2 F^T W F v + 2 lambda v`; constant in `x`.
    pub fn hess_dot(&self, x: Option<&[f64]>, vector: &[f64]) -> Result<Vec<f64>> {
        check_len("Costfunction::hess_dot", self.n(), vector.len())?;
        let fv = self.weight(self.fwd_model.jac_dot(x, vector)?);
        let mut result = self.fwd_model.jac_t_dot(x, &fv)?;
        for (h, v) in result.iter_mut().zip(vector) {
            *h = 2.0 * *h + 2.0 * self.lambda * v;
        }
        Ok(result)
    }
}
