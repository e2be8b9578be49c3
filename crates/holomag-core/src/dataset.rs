//! Collections of phase maps paired with the projections that produced them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use holomag_spectral::SpectralBackend;
use ndarray::{Array3, ArrayView1, Zip};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::error::{HoloError, Result};
use crate::phasemapper::{KernelGeometry, PhaseKernel, PhaseMapper, RdfcMapper};
use crate::projection::Projector;
use crate::types::{PhaseMap, VectorField};

/// Phase maps of one object, each with its projector and phase mapper.
///
/// Pairs are appended in acquisition order; the order defines the layout of
/// the stacked phase vector (see [`DataSet::hook_points`]). Phase mappers are
/// shared between all pairs with the same image shape.
pub struct DataSet {
    a: f64,
    dim: [usize; 3],
    b_0: f64,
    mask: Array3<bool>,
    geometry: KernelGeometry,
    backend: Arc<dyn SpectralBackend>,
    phase_maps: Vec<PhaseMap>,
    projectors: Vec<Projector>,
    mappers: Vec<Arc<dyn PhaseMapper>>,
    mapper_cache: HashMap<(usize, usize), Arc<dyn PhaseMapper>>,
}

impl fmt::Debug for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSet")
            .field("a", &self.a)
            .field("dim", &self.dim)
            .field("b_0", &self.b_0)
            .field("geometry", &self.geometry)
            .field("backend", &self.backend.backend_type())
            .field("count", &self.count())
            .field("projections", &self.projectors.len())
            .finish()
    }
}

impl DataSet {
    pub fn new(
        a: f64,
        dim: [usize; 3],
        b_0: f64,
        mask: Option<Array3<bool>>,
        backend: Arc<dyn SpectralBackend>,
    ) -> Result<Self> {
        if !(a.is_finite() && a > 0.0) {
            return Err(HoloError::InvalidInput(format!(
                "grid spacing must be positive and finite, got {a}"
            )));
        }
        if dim.contains(&0) {
            return Err(HoloError::InvalidInput(format!("grid must be non-empty, got {dim:?}")));
        }
        if !b_0.is_finite() {
            return Err(HoloError::InvalidInput(format!("b_0 must be finite, got {b_0}")));
        }
        let mask = match mask {
            Some(mask) if mask.shape() != dim.as_slice() => {
                return Err(HoloError::InvalidInput(format!(
                    "mask shape {:?} does not match grid {dim:?}",
                    mask.shape()
                )));
            }
            Some(mask) => mask,
            None => Array3::from_elem(dim, true),
        };
        Ok(Self {
            a,
            dim,
            b_0,
            mask,
            geometry: KernelGeometry::default(),
            backend,
            phase_maps: Vec::new(),
            projectors: Vec::new(),
            mappers: Vec::new(),
            mapper_cache: HashMap::new(),
        })
    }

    /// A dataset using the saturation induction, kernel geometry and spectral
    /// backend of a pipeline configuration.
    pub fn from_config(
        a: f64,
        dim: [usize; 3],
        mask: Option<Array3<bool>>,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let mut data = Self::new(a, dim, config.b_0, mask, config.backend()?)?;
        data.geometry = config.kernel_geometry;
        Ok(data)
    }

    /// Choose the pixel model of the phase kernel. Only valid while empty.
    pub fn with_kernel_geometry(mut self, geometry: KernelGeometry) -> Result<Self> {
        if !self.projectors.is_empty() {
            return Err(HoloError::Configuration(
                "kernel geometry must be set before appending phase maps".into(),
            ));
        }
        self.geometry = geometry;
        Ok(self)
    }

    /// Add a phase map and the projection it was recorded with.
    pub fn append(&mut self, phase_map: PhaseMap, projector: Projector) -> Result<()> {
        log::debug!("Calling DataSet::append ({})", projector.geometry());
        if projector.dim() != self.dim {
            return Err(HoloError::InvalidInput(format!(
                "projector grid {:?} does not match dataset grid {:?}",
                projector.dim(),
                self.dim
            )));
        }
        if (phase_map.a() - self.a).abs() > 1e-12 * self.a {
            return Err(HoloError::InvalidInput(format!(
                "phase map spacing {} does not match dataset spacing {}",
                phase_map.a(),
                self.a
            )));
        }
        if phase_map.dim_uv() != projector.dim_uv() {
            return Err(HoloError::InvalidInput(format!(
                "phase map shape {:?} does not match projector image {:?}",
                phase_map.dim_uv(),
                projector.dim_uv()
            )));
        }

        let mapper = self.mapper_for(projector.dim_uv())?;
        self.phase_maps.push(phase_map);
        self.projectors.push(projector);
        self.mappers.push(mapper);
        Ok(())
    }

    fn mapper_for(&mut self, dim_uv: (usize, usize)) -> Result<Arc<dyn PhaseMapper>> {
        if let Some(mapper) = self.mapper_cache.get(&dim_uv) {
            return Ok(Arc::clone(mapper));
        }
        let kernel = PhaseKernel::new(
            self.a,
            dim_uv,
            self.b_0,
            self.geometry,
            Arc::clone(&self.backend),
        )?;
        let mapper: Arc<dyn PhaseMapper> = Arc::new(RdfcMapper::new(Arc::new(kernel)));
        self.mapper_cache.insert(dim_uv, Arc::clone(&mapper));
        Ok(mapper)
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn dim(&self) -> [usize; 3] {
        self.dim
    }

    pub fn b_0(&self) -> f64 {
        self.b_0
    }

    pub fn kernel_geometry(&self) -> KernelGeometry {
        self.geometry
    }

    pub fn mask(&self) -> &Array3<bool> {
        &self.mask
    }

    /// Number of voxels inside the mask.
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Length of the masked magnetization vector.
    pub fn n(&self) -> usize {
        3 * self.count()
    }

    /// Length of the stacked phase vector.
    pub fn m(&self) -> usize {
        self.phase_maps.iter().map(PhaseMap::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.projectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.projectors.len()
    }

    /// Start offsets of every phase map inside the stacked phase vector,
    /// followed by `m`.
    pub fn hook_points(&self) -> Vec<usize> {
        let mut hooks = Vec::with_capacity(self.phase_maps.len() + 1);
        hooks.push(0);
        let mut offset = 0;
        for phase_map in &self.phase_maps {
            offset += phase_map.size();
            hooks.push(offset);
        }
        hooks
    }

    pub fn phase_maps(&self) -> &[PhaseMap] {
        &self.phase_maps
    }

    pub fn projectors(&self) -> &[Projector] {
        &self.projectors
    }

    pub fn mapper(&self, index: usize) -> Option<&Arc<dyn PhaseMapper>> {
        self.mappers.get(index)
    }

    pub(crate) fn pairs(&self) -> impl Iterator<Item = (&Projector, &Arc<dyn PhaseMapper>)> {
        self.projectors.iter().zip(&self.mappers)
    }

    /// All phase maps concatenated in append order.
    pub fn phase_vec(&self) -> Vec<f64> {
        let mut phase = Vec::with_capacity(self.m());
        for phase_map in &self.phase_maps {
            phase.extend(phase_map.phase().iter().copied());
        }
        phase
    }

    /// Confidences of all phase maps concatenated in append order.
    pub fn confidence_vec(&self) -> Vec<f64> {
        let mut confidence = Vec::with_capacity(self.m());
        for phase_map in &self.phase_maps {
            confidence.extend(phase_map.confidence().iter().copied());
        }
        confidence
    }

    /// Simulate the phase map of `mag` for every projection in the dataset.
    ///
    /// Projections are evaluated in parallel; the result keeps append order.
    pub fn create_phase_maps(&self, mag: &VectorField) -> Result<Vec<PhaseMap>> {
        log::debug!("Calling create_phase_maps for {} projections", self.len());
        if mag.dim() != self.dim {
            return Err(HoloError::InvalidInput(format!(
                "field grid {:?} does not match dataset grid {:?}",
                mag.dim(),
                self.dim
            )));
        }
        self.projectors
            .par_iter()
            .zip(&self.mappers)
            .map(|(projector, mapper)| mapper.map(&projector.project(mag)?))
            .collect()
    }

    /// Replace the 3-D mask by the intersection of the back-projected phase
    /// map masks.
    ///
    /// A voxel is kept if, in every projection, at least `threshold` of its
    /// projected weight falls on masked pixels.
    pub fn set_3d_mask(&mut self, threshold: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(HoloError::InvalidInput(format!(
                "mask threshold must lie in [0, 1], got {threshold}"
            )));
        }
        if self.is_empty() {
            return Err(HoloError::Configuration(
                "cannot derive a 3-D mask from an empty dataset".into(),
            ));
        }

        let mut mask = Array3::from_elem(self.dim, true);
        for (projector, phase_map) in self.projectors.iter().zip(&self.phase_maps) {
            let weights = projector.weights();
            let inside: Vec<f64> = phase_map
                .mask()
                .iter()
                .map(|&m| if m { 1.0 } else { 0.0 })
                .collect();
            let hit = weights.transpose_dot(&inside)?;
            let total = weights.transpose_dot(&vec![1.0; weights.rows()])?;
            let flat_mask = mask
                .view_mut()
                .into_shape_with_order(hit.len())
                .map_err(|e| HoloError::InvalidInput(e.to_string()))?;
            Zip::from(flat_mask)
                .and(ArrayView1::from(&hit))
                .and(ArrayView1::from(&total))
                .for_each(|keep, &h, &t| *keep = *keep && t > 0.0 && h >= threshold * t);
        }

        log::debug!(
            "3-D mask from {} projections keeps {} of {} voxels",
            self.len(),
            mask.iter().filter(|&&m| m).count(),
            mask.len()
        );
        self.mask = mask;
        Ok(())
    }
}
