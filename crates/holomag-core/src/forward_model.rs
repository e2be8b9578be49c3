//! The linear forward model of a dataset.
//!
//! For a masked magnetization vector $x$ of length $n$ the forward model
//! returns the stacked simulated phase $F x$ of length $m$; phase map $i$
//! occupies `[hook_points[i], hook_points[i + 1])`. Since $F$ is linear, the
//! Jacobian product equals the forward evaluation and the transpose product
//! runs every projection and phase mapper backwards.

use ndarray::Array3;

use crate::dataset::DataSet;
use crate::error::{check_len, HoloError, Result};
use crate::types::VectorField;

/// Forward model bound to one [`DataSet`].
#[derive(Debug)]
pub struct ForwardModel {
    data: DataSet,
    /// Row-major voxel indices inside the mask.
    masked: Vec<usize>,
    hook_points: Vec<usize>,
}

impl ForwardModel {
    pub fn new(data: DataSet) -> Result<Self> {
        if data.is_empty() {
            return Err(HoloError::Configuration(
                "forward model needs a dataset with at least one phase map".into(),
            ));
        }
        if data.count() == 0 {
            return Err(HoloError::Configuration(
                "forward model needs a dataset mask with at least one voxel".into(),
            ));
        }
        let masked = data
            .mask()
            .iter()
            .enumerate()
            .filter_map(|(idx, &m)| m.then_some(idx))
            .collect();
        let hook_points = data.hook_points();
        log::debug!(
            "Creating forward model: n = {}, m = {}, {} projections",
            data.n(),
            data.m(),
            data.len()
        );
        Ok(Self {
            data,
            masked,
            hook_points,
        })
    }

    pub fn data_set(&self) -> &DataSet {
        &self.data
    }

    /// Length of the masked magnetization vector.
    pub fn n(&self) -> usize {
        3 * self.masked.len()
    }

    /// Length of the stacked phase vector.
    pub fn m(&self) -> usize {
        self.hook_points.last().copied().unwrap_or(0)
    }

    pub fn hook_points(&self) -> &[usize] {
        &self.hook_points
    }

    /// Masked vector to a full `3N` component-major vector, zero outside the mask.
    fn scatter(&self, vector: &[f64]) -> Vec<f64> {
        let size = self.data.dim().iter().product::<usize>();
        let count = self.masked.len();
        let mut full = vec![0.0; 3 * size];
        for c in 0..3 {
            for (k, &idx) in self.masked.iter().enumerate() {
                full[c * size + idx] = vector[c * count + k];
            }
        }
        full
    }

    /// Inverse of [`ForwardModel::scatter`] restricted to the mask.
    fn gather(&self, full: &[f64]) -> Vec<f64> {
        let size = self.data.dim().iter().product::<usize>();
        (0..3)
            .flat_map(|c| self.masked.iter().map(move |&idx| full[c * size + idx]))
            .collect()
    }

    /// Simulated stacked phase of a masked magnetization vector.
    pub fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>> {
        log::debug!("Calling ForwardModel::evaluate");
        check_len("ForwardModel::evaluate", self.n(), x.len())?;
        let full = self.scatter(x);
        let mut result = Vec::with_capacity(self.m());
        for (projector, mapper) in self.data.pairs() {
            result.extend(mapper.jac_dot(&projector.jac_dot(&full)?)?);
        }
        Ok(result)
    }

    /// Jacobian at `x` times `vector`. The model is linear, so `x` only has
    /// its length checked.
    pub fn jac_dot(&self, x: Option<&[f64]>, vector: &[f64]) -> Result<Vec<f64>> {
        if let Some(x) = x {
            check_len("ForwardModel::jac_dot (x)", self.n(), x.len())?;
        }
        check_len("ForwardModel::jac_dot", self.n(), vector.len())?;
        self.evaluate(vector)
    }

    /// Transposed Jacobian at `x` times a stacked phase `vector`.
    pub fn jac_t_dot(&self, x: Option<&[f64]>, vector: &[f64]) -> Result<Vec<f64>> {
        log::debug!("Calling ForwardModel::jac_t_dot");
        if let Some(x) = x {
            check_len("ForwardModel::jac_t_dot (x)", self.n(), x.len())?;
        }
        check_len("ForwardModel::jac_t_dot", self.m(), vector.len())?;

        let size = self.data.dim().iter().product::<usize>();
        let mut full = vec![0.0; 3 * size];
        for (i, (projector, mapper)) in self.data.pairs().enumerate() {
            let part = &vector[self.hook_points[i]..self.hook_points[i + 1]];
            let back = projector.jac_t_dot(&mapper.jac_t_dot(part)?)?;
            for (acc, b) in full.iter_mut().zip(back) {
                *acc += b;
            }
        }
        Ok(self.gather(&full))
    }

    /// Place a masked vector into a full field on the dataset grid.
    pub fn to_vector_field(&self, x: &[f64]) -> Result<VectorField> {
        check_len("ForwardModel::to_vector_field", self.n(), x.len())?;
        VectorField::from_flat(self.data.a(), self.data.dim(), self.scatter(x))
    }

    /// Masked vector of a field on the dataset grid.
    pub fn from_vector_field(&self, field: &VectorField) -> Result<Vec<f64>> {
        let mask: &Array3<bool> = self.data.mask();
        field.get_vector(mask)
    }
}
