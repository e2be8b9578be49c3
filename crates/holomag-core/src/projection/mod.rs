//! Projection of 3-D vector fields onto 2-D images.
//!
//! A [`Projector`] integrates a field along the beam direction. It carries a
//! sparse weight matrix from voxels to pixels and three coefficient rows that
//! pick the in-plane (`u`, `v`) and out-of-plane (`w`) components of the
//! magnetization for its geometry.
//!
//! | Geometry | Image | `u` | `v` | `w` |
//! |----------|-------|-----|-----|-----|
//! | simple z | (Y, X) | M_x | M_y | M_z |
//! | simple y | (Z, X) | M_x | M_z | -M_y |
//! | simple x | (Y, Z) | M_z | M_y | -M_x |
//! | x-tilt   | (Y, X) | M . e_u | M . e_v | M . e_w |
//! | y-tilt   | (Y, X) | M . e_u | M . e_v | M . e_w |
//!
//! Tilted geometries rotate the image axes with [`nalgebra::Rotation3`] and
//! splat every voxel bilinearly onto the image.

pub mod weights;

use std::fmt;

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{check_len, HoloError, Result};
use crate::types::VectorField;

pub use weights::SparseWeights;

/// Snap distance below which a splatting coordinate counts as on a pixel centre.
const PIXEL_SNAP: f64 = 1e-9;

/// Beam direction of a simple projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionAxis {
    X,
    Y,
    Z,
}

/// The closed set of supported projection geometries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectionGeometry {
    /// Straight projection along a grid axis.
    Simple { axis: ProjectionAxis },
    /// Beam along z after rotating the object by `tilt` radians about x.
    XTilt { tilt: f64 },
    /// Beam along z after rotating the object by `tilt` radians about y.
    YTilt { tilt: f64 },
}

impl fmt::Display for ProjectionGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionGeometry::Simple { axis } => {
                let name = match axis {
                    ProjectionAxis::X => "x",
                    ProjectionAxis::Y => "y",
                    ProjectionAxis::Z => "z",
                };
                write!(f, "projected along {name}-axis")
            }
            ProjectionGeometry::XTilt { tilt } => {
                write!(f, "tilted around x-axis (tilt angle: {:.1}°)", tilt.to_degrees())
            }
            ProjectionGeometry::YTilt { tilt } => {
                write!(f, "tilted around y-axis (tilt angle: {:.1}°)", tilt.to_degrees())
            }
        }
    }
}

/// A linear projection of a `(Z, Y, X)` vector field onto a `(V, U)` image.
#[derive(Debug, Clone, PartialEq)]
pub struct Projector {
    geometry: ProjectionGeometry,
    dim: [usize; 3],
    dim_uv: (usize, usize),
    weights: SparseWeights,
    /// Rows u, v, w; columns x, y, z.
    coeff: [[f64; 3]; 3],
}

impl Projector {
    pub fn new(dim: [usize; 3], geometry: ProjectionGeometry) -> Result<Self> {
        let dim_uv = match geometry {
            ProjectionGeometry::Simple { axis } => simple_dim_uv(dim, axis),
            ProjectionGeometry::XTilt { .. } | ProjectionGeometry::YTilt { .. } => (dim[1], dim[2]),
        };
        Self::build(dim, geometry, dim_uv)
    }

    pub fn simple(dim: [usize; 3], axis: ProjectionAxis) -> Result<Self> {
        Self::new(dim, ProjectionGeometry::Simple { axis })
    }

    pub fn x_tilt(dim: [usize; 3], tilt: f64) -> Result<Self> {
        Self::new(dim, ProjectionGeometry::XTilt { tilt })
    }

    pub fn y_tilt(dim: [usize; 3], tilt: f64) -> Result<Self> {
        Self::new(dim, ProjectionGeometry::YTilt { tilt })
    }

    /// Rebuild a tilted projector onto an image of a different size.
    ///
    /// Simple projections have a fixed image shape.
    pub fn with_dim_uv(self, dim_uv: (usize, usize)) -> Result<Self> {
        if let ProjectionGeometry::Simple { axis } = self.geometry {
            if dim_uv != simple_dim_uv(self.dim, axis) {
                return Err(HoloError::InvalidInput(format!(
                    "simple projection along {axis:?} has a fixed image shape {:?}",
                    self.dim_uv
                )));
            }
            return Ok(self);
        }
        Self::build(self.dim, self.geometry, dim_uv)
    }

    fn build(
        dim: [usize; 3],
        geometry: ProjectionGeometry,
        dim_uv: (usize, usize),
    ) -> Result<Self> {
        if dim.contains(&0) || dim_uv.0 == 0 || dim_uv.1 == 0 {
            return Err(HoloError::InvalidInput(format!(
                "projection needs a non-empty grid and image, got {dim:?} -> {dim_uv:?}"
            )));
        }
        let (weights, coeff) = match geometry {
            ProjectionGeometry::Simple { axis } => (simple_weights(dim, axis)?, simple_coeff(axis)),
            ProjectionGeometry::XTilt { tilt } | ProjectionGeometry::YTilt { tilt } => {
                if !tilt.is_finite() {
                    return Err(HoloError::InvalidInput(format!(
                        "tilt angle must be finite, got {tilt}"
                    )));
                }
                let rotation = match geometry {
                    ProjectionGeometry::XTilt { .. } => {
                        Rotation3::from_axis_angle(&Vector3::x_axis(), tilt)
                    }
                    _ => Rotation3::from_axis_angle(&Vector3::y_axis(), tilt),
                };
                let e_u = rotation * Vector3::x();
                let e_v = rotation * Vector3::y();
                let e_w = rotation * Vector3::z();
                let coeff = [
                    [e_u.x, e_u.y, e_u.z],
                    [e_v.x, e_v.y, e_v.z],
                    [e_w.x, e_w.y, e_w.z],
                ];
                (tilted_weights(dim, dim_uv, &e_u, &e_v)?, coeff)
            }
        };
        log::debug!(
            "Built projector ({geometry}) {dim:?} -> {dim_uv:?} with {} weights",
            weights.nnz()
        );
        Ok(Self {
            geometry,
            dim,
            dim_uv,
            weights,
            coeff,
        })
    }

    pub fn geometry(&self) -> ProjectionGeometry {
        self.geometry
    }

    /// Grid shape `(Z, Y, X)`.
    pub fn dim(&self) -> [usize; 3] {
        self.dim
    }

    /// Image shape `(V, U)`.
    pub fn dim_uv(&self) -> (usize, usize) {
        self.dim_uv
    }

    /// Number of voxels.
    pub fn size_3d(&self) -> usize {
        self.dim.iter().product()
    }

    /// Number of pixels.
    pub fn size_2d(&self) -> usize {
        self.dim_uv.0 * self.dim_uv.1
    }

    pub fn weights(&self) -> &SparseWeights {
        &self.weights
    }

    /// Component coefficients, rows u, v, w over columns x, y, z.
    pub fn coefficients(&self) -> &[[f64; 3]; 3] {
        &self.coeff
    }

    /// Mix the three component blocks of a `3N` vector with one coefficient row.
    fn mix(&self, row: usize, vector: &[f64]) -> Vec<f64> {
        let n = self.size_3d();
        let [cx, cy, cz] = self.coeff[row];
        (0..n)
            .map(|i| cx * vector[i] + cy * vector[n + i] + cz * vector[2 * n + i])
            .collect()
    }

    /// Project a field; the result has grid `(1, V, U)` and components u, v, w.
    pub fn project(&self, field: &VectorField) -> Result<VectorField> {
        log::debug!("Calling project ({})", self.geometry);
        if field.dim() != self.dim {
            return Err(HoloError::InvalidInput(format!(
                "field grid {:?} does not match projector grid {:?}",
                field.dim(),
                self.dim
            )));
        }
        let flat = field.to_flat();
        let mut values = Vec::with_capacity(3 * self.size_2d());
        for row in 0..3 {
            values.extend(self.weights.dot(&self.mix(row, &flat))?);
        }
        VectorField::from_flat(field.a(), [1, self.dim_uv.0, self.dim_uv.1], values)
    }

    /// Jacobian product: `3N` magnetization to the stacked `2UV` (u, v) projection.
    pub fn jac_dot(&self, vector: &[f64]) -> Result<Vec<f64>> {
        check_len("Projector::jac_dot", 3 * self.size_3d(), vector.len())?;
        let mut result = self.weights.dot(&self.mix(0, vector))?;
        result.extend(self.weights.dot(&self.mix(1, vector))?);
        Ok(result)
    }

    /// Transposed Jacobian product: `2UV` to `3N`.
    pub fn jac_t_dot(&self, vector: &[f64]) -> Result<Vec<f64>> {
        let size_2d = self.size_2d();
        check_len("Projector::jac_t_dot", 2 * size_2d, vector.len())?;
        let back_u = self.weights.transpose_dot(&vector[..size_2d])?;
        let back_v = self.weights.transpose_dot(&vector[size_2d..])?;
        let mut result = Vec::with_capacity(3 * self.size_3d());
        for c in 0..3 {
            let (cu, cv) = (self.coeff[0][c], self.coeff[1][c]);
            result.extend(back_u.iter().zip(&back_v).map(|(u, v)| cu * u + cv * v));
        }
        Ok(result)
    }
}

fn simple_dim_uv(dim: [usize; 3], axis: ProjectionAxis) -> (usize, usize) {
    let [z, y, x] = dim;
    match axis {
        ProjectionAxis::Z => (y, x),
        ProjectionAxis::Y => (z, x),
        ProjectionAxis::X => (y, z),
    }
}

fn simple_coeff(axis: ProjectionAxis) -> [[f64; 3]; 3] {
    match axis {
        ProjectionAxis::Z => [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        ProjectionAxis::Y => [[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]],
        ProjectionAxis::X => [[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]],
    }
}

fn simple_weights(dim: [usize; 3], axis: ProjectionAxis) -> Result<SparseWeights> {
    let [nz, ny, nx] = dim;
    let (_, nu) = simple_dim_uv(dim, axis);
    let mut triplets = Vec::with_capacity(nz * ny * nx);
    for (k, j, i) in ndarray::indices((nz, ny, nx)) {
        let voxel = (k * ny + j) * nx + i;
        let (pv, pu) = match axis {
            ProjectionAxis::Z => (j, i),
            ProjectionAxis::Y => (k, i),
            ProjectionAxis::X => (j, k),
        };
        triplets.push((pv * nu + pu, voxel, 1.0));
    }
    SparseWeights::from_triplets(simple_dim_uv(dim, axis).0 * nu, nz * ny * nx, triplets)
}

/// Bilinear splatting of voxel centres along the rotated image axes.
fn tilted_weights(
    dim: [usize; 3],
    dim_uv: (usize, usize),
    e_u: &Vector3<f64>,
    e_v: &Vector3<f64>,
) -> Result<SparseWeights> {
    let [nz, ny, nx] = dim;
    let (nv, nu) = dim_uv;
    let centre = Vector3::new(nx as f64 / 2.0, ny as f64 / 2.0, nz as f64 / 2.0);
    let mut triplets = Vec::with_capacity(4 * nz * ny * nx);

    for (k, j, i) in ndarray::indices((nz, ny, nx)) {
        let voxel = (k * ny + j) * nx + i;
        let pos = Vector3::new(i as f64 + 0.5, j as f64 + 0.5, k as f64 + 0.5) - centre;
        let fu = snap(pos.dot(e_u) + nu as f64 / 2.0 - 0.5);
        let fv = snap(pos.dot(e_v) + nv as f64 / 2.0 - 0.5);

        let (u0, v0) = (fu.floor(), fv.floor());
        let (tu, tv) = (fu - u0, fv - v0);
        for (du, wu) in [(0.0, 1.0 - tu), (1.0, tu)] {
            for (dv, wv) in [(0.0, 1.0 - tv), (1.0, tv)] {
                let weight = wu * wv;
                let (pu, pv) = (u0 + du, v0 + dv);
                if weight == 0.0 || pu < 0.0 || pv < 0.0 || pu >= nu as f64 || pv >= nv as f64 {
                    continue;
                }
                triplets.push((pv as usize * nu + pu as usize, voxel, weight));
            }
        }
    }
    SparseWeights::from_triplets(nv * nu, nz * ny * nx, triplets)
}

fn snap(coord: f64) -> f64 {
    let rounded = coord.round();
    if (coord - rounded).abs() < PIXEL_SNAP {
        rounded
    } else {
        coord
    }
}
