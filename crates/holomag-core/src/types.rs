//! Core types shared across the holomag framework.
//!
//! This module defines the two data containers that flow through the
//! pipeline: [`VectorField`] (magnetization, vector potential, B-field) and
//! [`PhaseMap`] (measured or simulated holography phase). Both validate
//! their shape and grid spacing on construction, so downstream operators can
//! rely on a well-formed value.

use ndarray::{Array2, Array3, Array4, ArrayView3, Axis, Zip};

use crate::error::{check_len, HoloError, Result};

/// Magnetic flux quantum $\Phi_0 = h / 2e$ in T nm².
pub const PHI_0: f64 = 2067.83;

fn validate_spacing(a: f64) -> Result<()> {
    if !(a.is_finite() && a > 0.0) {
        return Err(HoloError::InvalidInput(format!(
            "grid spacing must be positive and finite, got {a}"
        )));
    }
    Ok(())
}

fn validate_mask(mask: &Array3<bool>, dim: [usize; 3]) -> Result<()> {
    if mask.shape() != dim.as_slice() {
        return Err(HoloError::InvalidInput(format!(
            "mask shape {:?} does not match grid {:?}",
            mask.shape(),
            dim
        )));
    }
    Ok(())
}

/// A three-component vector field on a regular grid.
///
/// The raw array always has shape `(3, Z, Y, X)`; the leading axis holds the
/// x, y and z components in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    /// Grid spacing (nm).
    a: f64,
    /// Component array, shape (3, Z, Y, X).
    field: Array4<f64>,
}

impl VectorField {
    /// Wrap a raw `(3, Z, Y, X)` array.
    pub fn new(a: f64, field: Array4<f64>) -> Result<Self> {
        validate_spacing(a)?;
        let shape = field.shape();
        if shape[0] != 3 {
            return Err(HoloError::InvalidInput(format!(
                "vector field needs 3 components along axis 0, got shape {shape:?}"
            )));
        }
        if shape[1..].contains(&0) {
            return Err(HoloError::InvalidInput(format!(
                "vector field grid must be non-empty, got shape {shape:?}"
            )));
        }
        Ok(Self { a, field })
    }

    /// An all-zero field on a grid of shape `(Z, Y, X)`.
    pub fn zeros(a: f64, dim: [usize; 3]) -> Result<Self> {
        Self::new(a, Array4::zeros((3, dim[0], dim[1], dim[2])))
    }

    /// Assemble a field from its x, y and z component grids.
    pub fn from_components(a: f64, components: [Array3<f64>; 3]) -> Result<Self> {
        let dim = components[0].raw_dim();
        if components.iter().any(|c| c.raw_dim() != dim) {
            return Err(HoloError::InvalidInput(
                "vector field components must share one grid shape".into(),
            ));
        }
        let views: Vec<_> = components.iter().map(|c| c.view()).collect();
        let field = ndarray::stack(Axis(0), &views)
            .map_err(|e| HoloError::InvalidInput(e.to_string()))?;
        Self::new(a, field)
    }

    /// Rebuild a field from the component-major flattening produced by
    /// [`VectorField::to_flat`].
    pub fn from_flat(a: f64, dim: [usize; 3], values: Vec<f64>) -> Result<Self> {
        check_len(
            "VectorField::from_flat",
            3 * dim.iter().product::<usize>(),
            values.len(),
        )?;
        let field = Array4::from_shape_vec((3, dim[0], dim[1], dim[2]), values)
            .map_err(|e| HoloError::InvalidInput(e.to_string()))?;
        Self::new(a, field)
    }

    /// Grid spacing (nm).
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Grid shape `(Z, Y, X)`.
    pub fn dim(&self) -> [usize; 3] {
        let s = self.field.shape();
        [s[1], s[2], s[3]]
    }

    /// Number of grid cells.
    pub fn size(&self) -> usize {
        self.dim().iter().product()
    }

    /// The raw `(3, Z, Y, X)` array.
    pub fn field(&self) -> &Array4<f64> {
        &self.field
    }

    pub fn into_field(self) -> Array4<f64> {
        self.field
    }

    /// View of one component (0 = x, 1 = y, 2 = z).
    ///
    /// # Panics
    /// Panics if `index > 2`.
    pub fn component(&self, index: usize) -> ArrayView3<'_, f64> {
        self.field.index_axis(Axis(0), index)
    }

    /// Euclidean norm of the vector in every cell.
    pub fn amplitude(&self) -> Array3<f64> {
        self.field.map_axis(Axis(0), |v| v.dot(&v).sqrt())
    }

    /// Flatten to a `3 * size` vector: all x values, then all y, then all z.
    pub fn to_flat(&self) -> Vec<f64> {
        self.field.iter().copied().collect()
    }

    /// Masked flattening: x values of the masked cells, then y, then z.
    pub fn get_vector(&self, mask: &Array3<bool>) -> Result<Vec<f64>> {
        validate_mask(mask, self.dim())?;
        let count = mask.iter().filter(|&&m| m).count();
        let mut vector = Vec::with_capacity(3 * count);
        for comp in self.field.outer_iter() {
            Zip::from(&comp).and(mask).for_each(|&v, &m| {
                if m {
                    vector.push(v);
                }
            });
        }
        Ok(vector)
    }

    /// Inverse of [`VectorField::get_vector`]; cells outside the mask are left untouched.
    pub fn set_vector(&mut self, vector: &[f64], mask: &Array3<bool>) -> Result<()> {
        validate_mask(mask, self.dim())?;
        let count = mask.iter().filter(|&&m| m).count();
        check_len("VectorField::set_vector", 3 * count, vector.len())?;

        let mut idx = 0;
        for mut comp in self.field.outer_iter_mut() {
            Zip::from(&mut comp).and(mask).for_each(|v, &m| {
                if m {
                    *v = vector[idx];
                    idx += 1;
                }
            });
        }
        Ok(())
    }

    /// A copy with every vector multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            a: self.a,
            field: &self.field * factor,
        }
    }

    fn check_compatible(&self, other: &VectorField) -> Result<()> {
        if self.dim() != other.dim() {
            return Err(HoloError::InvalidInput(format!(
                "vector fields have different grids: {:?} vs {:?}",
                self.dim(),
                other.dim()
            )));
        }
        if (self.a - other.a).abs() > 1e-12 * self.a {
            return Err(HoloError::InvalidInput(format!(
                "vector fields have different grid spacings: {} vs {}",
                self.a, other.a
            )));
        }
        Ok(())
    }

    /// Cell-wise sum of two fields on the same grid.
    pub fn try_add(&self, other: &VectorField) -> Result<Self> {
        self.check_compatible(other)?;
        Ok(Self {
            a: self.a,
            field: &self.field + &other.field,
        })
    }

    /// Cell-wise difference of two fields on the same grid.
    pub fn try_sub(&self, other: &VectorField) -> Result<Self> {
        self.check_compatible(other)?;
        Ok(Self {
            a: self.a,
            field: &self.field - &other.field,
        })
    }
}

/// A 2-D holography phase image with an optional mask and confidence weights.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseMap {
    /// Grid spacing (nm).
    a: f64,
    /// Phase (rad), shape (V, U).
    phase: Array2<f64>,
    /// Pixels that belong to the object; all true by default.
    mask: Array2<bool>,
    /// Per-pixel confidence in [0, 1]; all ones by default.
    confidence: Array2<f64>,
}

impl PhaseMap {
    pub fn new(a: f64, phase: Array2<f64>) -> Result<Self> {
        validate_spacing(a)?;
        if phase.is_empty() {
            return Err(HoloError::InvalidInput("phase map must be non-empty".into()));
        }
        let dim = phase.raw_dim();
        Ok(Self {
            a,
            phase,
            mask: Array2::from_elem(dim, true),
            confidence: Array2::ones(dim),
        })
    }

    pub fn with_mask(mut self, mask: Array2<bool>) -> Result<Self> {
        if mask.raw_dim() != self.phase.raw_dim() {
            return Err(HoloError::InvalidInput(format!(
                "mask shape {:?} does not match phase shape {:?}",
                mask.shape(),
                self.phase.shape()
            )));
        }
        self.mask = mask;
        Ok(self)
    }

    pub fn with_confidence(mut self, confidence: Array2<f64>) -> Result<Self> {
        if confidence.raw_dim() != self.phase.raw_dim() {
            return Err(HoloError::InvalidInput(format!(
                "confidence shape {:?} does not match phase shape {:?}",
                confidence.shape(),
                self.phase.shape()
            )));
        }
        if confidence.iter().any(|&c| !(0.0..=1.0).contains(&c)) {
            return Err(HoloError::InvalidInput(
                "confidence values must lie in [0, 1]".into(),
            ));
        }
        self.confidence = confidence;
        Ok(self)
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn phase(&self) -> &Array2<f64> {
        &self.phase
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn confidence(&self) -> &Array2<f64> {
        &self.confidence
    }

    /// Image shape `(V, U)`.
    pub fn dim_uv(&self) -> (usize, usize) {
        self.phase.dim()
    }

    /// Number of pixels.
    pub fn size(&self) -> usize {
        self.phase.len()
    }

    /// Row-major flattening of the phase.
    pub fn phase_vec(&self) -> Vec<f64> {
        self.phase.iter().copied().collect()
    }

    /// Pixel-wise difference; the result keeps the pixels masked in both maps.
    pub fn try_sub(&self, other: &PhaseMap) -> Result<PhaseMap> {
        if self.dim_uv() != other.dim_uv() {
            return Err(HoloError::InvalidInput(format!(
                "phase maps have different shapes: {:?} vs {:?}",
                self.dim_uv(),
                other.dim_uv()
            )));
        }
        let mut mask = self.mask.clone();
        Zip::from(&mut mask).and(&other.mask).for_each(|m, &o| *m = *m && o);
        Ok(PhaseMap {
            a: self.a,
            phase: &self.phase - &other.phase,
            mask,
            confidence: self.confidence.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp_field(dim: [usize; 3]) -> VectorField {
        let field = Array4::from_shape_fn((3, dim[0], dim[1], dim[2]), |(c, k, j, i)| {
            (c * 1000 + k * 100 + j * 10 + i) as f64
        });
        VectorField::new(2.0, field).unwrap()
    }

    #[test]
    fn test_rejects_wrong_component_count_and_spacing() {
        let err = VectorField::new(1.0, Array4::zeros((2, 3, 3, 3))).unwrap_err();
        assert!(matches!(err, HoloError::InvalidInput(_)));

        let err = VectorField::zeros(0.0, [2, 2, 2]).unwrap_err();
        assert!(matches!(err, HoloError::InvalidInput(_)));

        let err = VectorField::zeros(f64::NAN, [2, 2, 2]).unwrap_err();
        assert!(matches!(err, HoloError::InvalidInput(_)));

        let err = VectorField::zeros(1.0, [2, 0, 2]).unwrap_err();
        assert!(matches!(err, HoloError::InvalidInput(_)));
    }

    #[test]
    fn test_get_and_set_vector_with_mask() {
        let dim = [2, 3, 4];
        let field = ramp_field(dim);
        let mut mask = Array3::from_elem(dim, false);
        mask[[0, 1, 2]] = true;
        mask[[1, 2, 3]] = true;

        let vector = field.get_vector(&mask).unwrap();
        assert_eq!(vector, vec![12.0, 123.0, 1012.0, 1123.0, 2012.0, 2123.0]);

        let mut target = VectorField::zeros(2.0, dim).unwrap();
        target.set_vector(&vector, &mask).unwrap();
        assert_abs_diff_eq!(target.field()[[1, 1, 2, 3]], 1123.0);
        assert_abs_diff_eq!(target.field()[[2, 0, 0, 0]], 0.0);

        let err = target.set_vector(&vector[..5], &mask).unwrap_err();
        assert!(matches!(err, HoloError::DimensionMismatch { expected: 6, found: 5, .. }));
    }

    #[test]
    fn test_flat_layout_is_component_major() {
        let field = ramp_field([1, 2, 2]);
        let flat = field.to_flat();
        assert_eq!(&flat[..4], &[0.0, 1.0, 10.0, 11.0]);
        assert_eq!(&flat[4..6], &[1000.0, 1001.0]);

        let back = VectorField::from_flat(2.0, [1, 2, 2], flat).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_amplitude_and_arithmetic() {
        let ones = Array3::ones((1, 1, 2));
        let field = VectorField::from_components(
            1.0,
            [ones.clone() * 3.0, ones.clone() * 4.0, Array3::zeros((1, 1, 2))],
        )
        .unwrap();
        assert_abs_diff_eq!(field.amplitude()[[0, 0, 1]], 5.0, epsilon = 1e-12);

        let doubled = field.try_add(&field).unwrap();
        assert_eq!(doubled, field.scaled(2.0));
        let zero = doubled.try_sub(&field.scaled(2.0)).unwrap();
        assert!(zero.field().iter().all(|&v| v == 0.0));

        let other = VectorField::zeros(2.0, [1, 1, 2]).unwrap();
        assert!(field.try_add(&other).is_err());
    }

    #[test]
    fn test_phase_map_mask_and_difference() {
        let phase = Array2::from_shape_fn((2, 3), |(j, i)| (j * 3 + i) as f64);
        let mut mask = Array2::from_elem((2, 3), true);
        mask[[0, 0]] = false;
        let map = PhaseMap::new(1.0, phase.clone()).unwrap().with_mask(mask).unwrap();
        let other = PhaseMap::new(1.0, phase).unwrap();

        let diff = map.try_sub(&other).unwrap();
        assert!(diff.phase().iter().all(|&v| v == 0.0));
        assert!(!diff.mask()[[0, 0]]);
        assert_eq!(diff.dim_uv(), (2, 3));
        assert_eq!(map.phase_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        let bad = PhaseMap::new(1.0, Array2::zeros((2, 3)))
            .unwrap()
            .with_confidence(Array2::from_elem((2, 3), 2.0));
        assert!(bad.is_err());
    }
}
