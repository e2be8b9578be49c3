//! Sparse projection weights in compressed sparse row layout.
//!
//! Row `r` holds the contributions of every voxel to image pixel `r`; pixels
//! and voxels are both numbered in row-major order.

use crate::error::{check_len, HoloError, Result};

/// A `pixels x voxels` sparse matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseWeights {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl SparseWeights {
    /// Assemble from `(row, col, weight)` triplets.
    ///
    /// Duplicate entries are summed and exact zeros are dropped.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        mut triplets: Vec<(usize, usize, f64)>,
    ) -> Result<Self> {
        if let Some(&(r, c, _)) = triplets.iter().find(|&&(r, c, _)| r >= rows || c >= cols) {
            return Err(HoloError::InvalidInput(format!(
                "weight entry ({r}, {c}) outside a {rows} x {cols} matrix"
            )));
        }
        triplets.sort_by_key(|&(r, c, _)| (r, c));

        let mut indptr = vec![0; rows + 1];
        let mut indices = Vec::with_capacity(triplets.len());
        let mut data: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, w) in triplets {
            if last == Some((r, c)) {
                if let Some(prev) = data.last_mut() {
                    *prev += w;
                }
                continue;
            }
            indices.push(c);
            data.push(w);
            indptr[r + 1] += 1;
            last = Some((r, c));
        }
        for r in 0..rows {
            indptr[r + 1] += indptr[r];
        }

        let mut weights = Self {
            rows,
            cols,
            indptr,
            indices,
            data,
        };
        weights.prune_zeros();
        Ok(weights)
    }

    fn prune_zeros(&mut self) {
        if self.data.iter().all(|&w| w != 0.0) {
            return;
        }
        let mut indptr = vec![0; self.rows + 1];
        let mut indices = Vec::with_capacity(self.indices.len());
        let mut data = Vec::with_capacity(self.data.len());
        for r in 0..self.rows {
            for k in self.indptr[r]..self.indptr[r + 1] {
                if self.data[k] != 0.0 {
                    indices.push(self.indices[k]);
                    data.push(self.data[k]);
                }
            }
            indptr[r + 1] = data.len();
        }
        self.indptr = indptr;
        self.indices = indices;
        self.data = data;
    }

    /// Number of pixels.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of voxels.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Stored `(voxel, weight)` entries of one pixel.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.indptr[r]..self.indptr[r + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    /// `W x`: voxel values to pixel values.
    pub fn dot(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_len("SparseWeights::dot", self.cols, x.len())?;
        Ok((0..self.rows)
            .map(|r| self.row(r).map(|(c, w)| w * x[c]).sum())
            .collect())
    }

    /// `W^T y`: pixel values back onto voxels.
    pub fn transpose_dot(&self, y: &[f64]) -> Result<Vec<f64>> {
        check_len("SparseWeights::transpose_dot", self.rows, y.len())?;
        let mut out = vec![0.0; self.cols];
        for (r, &yr) in y.iter().enumerate() {
            if yr == 0.0 {
                continue;
            }
            for (c, w) in self.row(r) {
                out[c] += w * yr;
            }
        }
        Ok(out)
    }
}
