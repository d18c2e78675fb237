//! Voxelation filter: deliberate resolution degradation.

use burn::tensor::backend::Backend;
use crate::error::{ImageError, Result};
use crate::image::{Image, ImageGrid};
use crate::interpolation::{BSplineInterpolator, NearestNeighborInterpolator};
use crate::transform::IdentityTransform;
use super::resample::ResampleImageFilter;

/// Replaces a volume with a coarse, block-wise copy of itself.
///
/// Two resampling passes: a cubic B-spline downsample onto a grid of
/// roughly `voxel_size_mm`-sized isotropic cubes covering the same physical
/// extent, then a nearest-neighbor upsample back onto the exact source
/// grid. The result is piecewise constant over the coarse blocks, which
/// destroys recognizable fine structure while preserving gross shape and
/// contrast.
#[derive(Debug, Clone, Copy)]
pub struct VoxelateFilter {
    voxel_size_mm: f64,
}

impl VoxelateFilter {
    /// Create a voxelation filter with a target cube edge length in mm.
    pub fn new(voxel_size_mm: f64) -> Self {
        Self { voxel_size_mm }
    }

    /// Coarse voxel counts for `grid`, per tensor dimension:
    /// `round(dim * spacing / voxel_size_mm)`, clamped to at least 1.
    ///
    /// When `voxel_size_mm` does not exceed the source spacing this equals
    /// the source size and voxelation degrades to a near no-op.
    pub fn coarse_shape<const D: usize>(grid: &ImageGrid<D>, voxel_size_mm: f64) -> [usize; D] {
        let mut shape = [0usize; D];
        for dim in 0..D {
            let extent = grid.size[dim] as f64 * grid.axis_spacing(dim);
            shape[dim] = ((extent / voxel_size_mm).round() as usize).max(1);
        }
        shape
    }

    /// Voxelate `source`, returning a volume on the identical grid.
    pub fn apply<B: Backend, const D: usize>(&self, source: &Image<B, D>) -> Result<Image<B, D>> {
        if !self.voxel_size_mm.is_finite() || self.voxel_size_mm <= 0.0 {
            return Err(ImageError::invalid_configuration(format!(
                "voxel size must be a positive length in mm, got {}",
                self.voxel_size_mm
            )));
        }

        let grid = source.grid();
        let coarse_size = Self::coarse_shape(&grid, self.voxel_size_mm);
        let coarse_grid = grid.with_size_preserving_extent(coarse_size);

        let downsampled = ResampleImageFilter::new(
            coarse_grid,
            IdentityTransform::new(),
            BSplineInterpolator::new(),
        )
        .apply(source);

        let upsampled = ResampleImageFilter::new(
            grid,
            IdentityTransform::new(),
            NearestNeighborInterpolator::new(),
        )
        .apply(&downsampled);

        Ok(upsampled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use burn::tensor::{Tensor, TensorData, Shape};
    use crate::spatial::{Point, Spacing, Direction};

    type B = NdArray<f32>;

    fn ramp_image(shape: [usize; 3], spacing: f64) -> Image<B, 3> {
        let device = Default::default();
        let n: usize = shape.iter().product();
        let data: Vec<f32> = (0..n).map(|v| v as f32).collect();
        let tensor = Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new(shape)), &device);
        Image::new(
            tensor,
            Point::origin(),
            Spacing::uniform(spacing),
            Direction::identity(),
        )
    }

    #[test]
    fn test_grid_is_preserved() {
        let image = ramp_image([8, 8, 8], 1.0);
        let result = VoxelateFilter::new(4.0).apply(&image).unwrap();
        assert_eq!(result.grid(), image.grid());
    }

    #[test]
    fn test_coarse_shape_formula() {
        let grid = ImageGrid::new(
            [176, 256, 256],
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
        );
        assert_eq!(VoxelateFilter::coarse_shape(&grid, 8.0), [22, 32, 32]);
    }

    #[test]
    fn test_coarse_shape_clamps_to_one() {
        let grid = ImageGrid::new(
            [4, 4, 4],
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
        );
        assert_eq!(VoxelateFilter::coarse_shape(&grid, 100.0), [1, 1, 1]);
    }

    #[test]
    fn test_fine_voxel_size_is_near_noop() {
        let grid = ImageGrid::new(
            [8, 8, 8],
            Point::origin(),
            Spacing::uniform(2.0),
            Direction::identity(),
        );
        // Cube edge equal to the spacing keeps the source dimensions.
        assert_eq!(VoxelateFilter::coarse_shape(&grid, 2.0), [8, 8, 8]);
    }

    #[test]
    fn test_blocks_are_piecewise_constant() {
        let image = ramp_image([8, 8, 8], 1.0);
        let result = VoxelateFilter::new(4.0).apply(&image).unwrap();

        let out = result.data().clone().into_data();
        let slice = out.as_slice::<f32>().unwrap().to_vec();

        let mut distinct = slice.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        distinct.sort_unstable();
        distinct.dedup();
        // 8 mm over 4 mm cubes: at most 2x2x2 distinct block values.
        assert!(distinct.len() <= 8, "expected coarse blocks, got {} values", distinct.len());
    }

    #[test]
    fn test_rejects_nonpositive_voxel_size() {
        let image = ramp_image([4, 4, 4], 1.0);
        assert!(VoxelateFilter::new(0.0).apply(&image).is_err());
        assert!(VoxelateFilter::new(-3.0).apply(&image).is_err());
    }
}
