//! Resample filter: map a volume onto a new grid through a transform.

use std::marker::PhantomData;
use burn::tensor::{Tensor, Shape};
use burn::tensor::backend::Backend;
use crate::image::{Image, ImageGrid, generate_grid};
use crate::interpolation::trait_::Interpolator;
use crate::transform::trait_::Transform;

/// Resamples a volume onto a target grid.
///
/// For every output voxel the filter computes its physical coordinate, maps
/// it backward through the transform into the input volume's physical space,
/// and samples the input there with the configured interpolator. Samples
/// falling outside the input's extent are filled with
/// `default_pixel_value` (0 unless overridden).
///
/// The transform maps output physical space to input physical space; use
/// [`crate::transform::IdentityTransform`] for pure grid changes.
///
/// Identical inputs always produce bit-identical output; there is no
/// randomness anywhere in the sampling.
pub struct ResampleImageFilter<B, T, I, const D: usize>
where
    B: Backend,
    T: Transform<B, D>,
    I: Interpolator<B>,
{
    grid: ImageGrid<D>,
    transform: T,
    interpolator: I,
    default_pixel_value: f64,
    _phantom: PhantomData<B>,
}

impl<B, T, I, const D: usize> ResampleImageFilter<B, T, I, D>
where
    B: Backend,
    T: Transform<B, D>,
    I: Interpolator<B>,
{
    /// Create a resample filter targeting `grid`.
    pub fn new(grid: ImageGrid<D>, transform: T, interpolator: I) -> Self {
        Self {
            grid,
            transform,
            interpolator,
            default_pixel_value: 0.0,
            _phantom: PhantomData,
        }
    }

    /// Target the grid of an existing volume.
    pub fn new_from_reference(reference: &Image<B, D>, transform: T, interpolator: I) -> Self {
        Self::new(reference.grid(), transform, interpolator)
    }

    /// Value used for samples outside the input volume's extent.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    /// Resample `input` onto the target grid.
    pub fn apply(&self, input: &Image<B, D>) -> Image<B, D> {
        let device = input.data().device();

        let output_indices = generate_grid::<B, D>(self.grid.size, &device);
        let output_points = self.grid.index_to_world_tensor(output_indices);
        let input_points = self.transform.transform_points(output_points);
        let input_indices = input.world_to_index_tensor(input_points);

        let values = self
            .interpolator
            .interpolate(input.data(), input_indices.clone());

        // Substitute the background value where the mapped point left the
        // input extent (the interpolators clamp, they do not fill).
        let inside = inside_extent_mask(input.shape(), &input_indices);
        let background = values.ones_like().mul_scalar(self.default_pixel_value);
        let filled = values * inside.clone() + background * (inside.ones_like() - inside);

        let output_data = filled.reshape(Shape::new(self.grid.size));
        Image::from_grid(output_data, &self.grid)
    }
}

/// 1.0 where a continuous index lies within the voxel extent
/// `[-0.5, dim - 0.5]` on every axis, 0.0 elsewhere.
fn inside_extent_mask<B: Backend, const D: usize>(
    dims: [usize; D],
    indices: &Tensor<B, 2>,
) -> Tensor<B, 1> {
    let n = indices.dims()[0];
    let mut mask = Tensor::<B, 1>::ones([n], &indices.device());
    for comp in 0..D {
        // Index component `comp` is (x, y, z) order; tensor dims are [Z, Y, X].
        let dim = dims[D - 1 - comp];
        let coord = indices.clone().narrow(1, comp, 1).squeeze::<1>(1);
        let ge = coord.clone().greater_equal_elem(-0.5).float();
        let le = coord.lower_equal_elem(dim as f64 - 0.5).float();
        mask = mask * ge * le;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use burn::tensor::TensorData;
    use crate::interpolation::{LinearInterpolator, NearestNeighborInterpolator};
    use crate::spatial::{Point, Spacing, Direction};
    use crate::transform::{AffineTransform, IdentityTransform};
    use nalgebra::SVector;

    type B = NdArray<f32>;

    fn make_image(data: Vec<f32>, shape: [usize; 3]) -> Image<B, 3> {
        let device = Default::default();
        let tensor = Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new(shape)), &device);
        Image::new(
            tensor,
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
        )
    }

    #[test]
    fn test_identity_resample_is_exact() {
        let data: Vec<f32> = (0..27).map(|v| v as f32 * 0.37 + 1.0).collect();
        let image = make_image(data, [3, 3, 3]);

        let filter = ResampleImageFilter::new_from_reference(
            &image,
            IdentityTransform::new(),
            NearestNeighborInterpolator::new(),
        );
        let result = filter.apply(&image);

        assert_eq!(result.grid(), image.grid());
        assert_eq!(
            result.data().clone().into_data(),
            image.data().clone().into_data()
        );
    }

    #[test]
    fn test_translation_shifts_content() {
        // Single bright voxel at (x, y, z) = (2, 2, 2) in a 5^3 volume.
        let mut data = vec![0.0f32; 125];
        data[2 * 25 + 2 * 5 + 2] = 1.0;
        let image = make_image(data, [5, 5, 5]);

        // Resampling with a backward map of -1 in x moves content +1 in x.
        let transform = AffineTransform::<3>::new(
            nalgebra::SMatrix::identity(),
            SVector::<f64, 3>::new(-1.0, 0.0, 0.0),
            SVector::zeros(),
        );
        let filter = ResampleImageFilter::new_from_reference(
            &image,
            transform,
            LinearInterpolator::new(),
        );
        let result = filter.apply(&image);

        let out = result.data().clone().into_data();
        let slice = out.as_slice::<f32>().unwrap();
        assert!(slice[2 * 25 + 2 * 5 + 3] > 0.9);
        assert!(slice[2 * 25 + 2 * 5 + 2] < 0.1);
    }

    #[test]
    fn test_outside_extent_uses_background() {
        let data = vec![5.0f32; 8];
        let image = make_image(data, [2, 2, 2]);

        // Backward map pushes every sample 10 voxels outside the source.
        let transform = AffineTransform::<3>::new(
            nalgebra::SMatrix::identity(),
            SVector::<f64, 3>::new(10.0, 10.0, 10.0),
            SVector::zeros(),
        );
        let filter = ResampleImageFilter::new_from_reference(
            &image,
            transform,
            NearestNeighborInterpolator::new(),
        )
        .with_default_pixel_value(-1.0);
        let result = filter.apply(&image);

        let out = result.data().clone().into_data();
        for v in out.as_slice::<f32>().unwrap() {
            assert_eq!(*v, -1.0);
        }
    }

    #[test]
    fn test_resample_onto_coarser_grid() {
        let data: Vec<f32> = (0..64).map(|v| v as f32).collect();
        let image = make_image(data, [4, 4, 4]);

        let coarse = image.grid().with_size_preserving_extent([2, 2, 2]);
        let filter = ResampleImageFilter::new(
            coarse.clone(),
            IdentityTransform::new(),
            LinearInterpolator::new(),
        );
        let result = filter.apply(&image);

        assert_eq!(result.shape(), [2, 2, 2]);
        assert_eq!(result.grid(), coarse);
    }
}
