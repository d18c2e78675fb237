//! Compositing filter: blend two volumes under a per-voxel weight.

use burn::tensor::backend::Backend;
use crate::error::{ImageError, Result};
use crate::image::Image;

/// Blends two volumes using a third as a per-voxel weight:
///
/// `out[v] = base[v] * weight[v] + replacement[v] * (1 - weight[v])`
///
/// All three volumes must be registered on the identical grid; that
/// precondition is checked before any arithmetic runs. In the defacing
/// pipeline `weight` is the warped face mask: 1 keeps the original voxel,
/// 0 substitutes the voxelated one, and any residual fractional weight
/// blends linearly.
#[derive(Debug, Clone, Copy)]
pub struct CompositeFilter {
    grid_tolerance: f64,
}

impl CompositeFilter {
    pub fn new() -> Self {
        Self {
            grid_tolerance: 1e-6,
        }
    }

    /// Override the epsilon used when comparing grid geometry.
    pub fn with_grid_tolerance(mut self, tolerance: f64) -> Self {
        self.grid_tolerance = tolerance;
        self
    }

    /// Blend `base` and `replacement` under `weight`.
    pub fn apply<B: Backend, const D: usize>(
        &self,
        base: &Image<B, D>,
        replacement: &Image<B, D>,
        weight: &Image<B, D>,
    ) -> Result<Image<B, D>> {
        let base_grid = base.grid();
        for (name, other) in [("replacement", replacement.grid()), ("weight", weight.grid())] {
            if !base_grid.approx_eq(&other, self.grid_tolerance) {
                return Err(ImageError::grid_mismatch(format!(
                    "{} volume is not on the base grid (base {:?} vs {:?})",
                    name, base_grid.size, other.size
                )));
            }
        }

        let w = weight.data().clone();
        let inverse = w.ones_like() - w.clone();
        let blended = base.data().clone() * w + replacement.data().clone() * inverse;

        Ok(Image::from_grid(blended, &base_grid))
    }
}

impl Default for CompositeFilter {
    fn default() -> Self {
        Self::new()
    }
}
