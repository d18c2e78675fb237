//! Subsampling filter: shrink a volume by integer factors.

use std::marker::PhantomData;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use crate::image::Image;

/// Keeps every Nth voxel along each tensor dimension and scales the spacing
/// to match. The origin is unchanged: the first kept voxel stays at the same
/// physical location. Pair with [`super::GaussianFilter`] to avoid aliasing.
pub struct DownsampleFilter<B: Backend> {
    factors: Vec<usize>,
    _backend: PhantomData<B>,
}

impl<B: Backend> DownsampleFilter<B> {
    /// Create a subsampling filter with per-dimension factors (`[Z, Y, X]`
    /// order, each >= 1).
    pub fn new(factors: Vec<usize>) -> Self {
        Self {
            factors,
            _backend: PhantomData,
        }
    }

    /// Subsample an image.
    pub fn apply<const D: usize>(&self, image: &Image<B, D>) -> Image<B, D> {
        let mut data = image.data().clone();
        let device = data.device();
        let dims: [usize; D] = data.shape().dims();
        let mut spacing = *image.spacing();

        for dim in 0..D {
            let factor = if dim < self.factors.len() {
                self.factors[dim]
            } else {
                self.factors[0]
            };
            if factor <= 1 {
                continue;
            }

            let kept: Vec<i32> = (0..dims[dim]).step_by(factor).map(|i| i as i32).collect();
            let indices = Tensor::<B, 1, burn::tensor::Int>::from_ints(kept.as_slice(), &device);
            data = data.select(dim, indices);

            // Tensor dim -> (x, y, z) spacing component.
            spacing[D - 1 - dim] *= factor as f64;
        }

        Image::new(data, *image.origin(), spacing, *image.direction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use burn::tensor::{TensorData, Shape};
    use crate::spatial::{Point, Spacing, Direction};

    type B = NdArray<f32>;

    #[test]
    fn test_shrinks_dims_and_scales_spacing() {
        let device = Default::default();
        let data: Vec<f32> = (0..64).map(|v| v as f32).collect();
        let image = Image::new(
            Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new([4, 4, 4])), &device),
            Point::origin(),
            Spacing::new([1.0, 2.0, 3.0]),
            Direction::identity(),
        );

        let result = DownsampleFilter::new(vec![2, 2, 2]).apply(&image);
        assert_eq!(result.shape(), [2, 2, 2]);
        // Spacing doubles on every axis, (x, y, z) order preserved.
        assert_eq!(*result.spacing(), Spacing::new([2.0, 4.0, 6.0]));
        assert_eq!(result.origin(), image.origin());
    }

    #[test]
    fn test_keeps_every_other_voxel() {
        let device = Default::default();
        let data: Vec<f32> = (0..64).map(|v| v as f32).collect();
        let image = Image::new(
            Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new([4, 4, 4])), &device),
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
        );

        let result = DownsampleFilter::new(vec![2, 2, 2]).apply(&image);
        let out = result.data().clone().into_data();
        let slice = out.as_slice::<f32>().unwrap();
        // Voxel (z=0, y=0, x=0) and (z=0, y=0, x=2) of the source.
        assert_eq!(slice[0], 0.0);
        assert_eq!(slice[1], 2.0);
        // Voxel (z=2, y=2, x=2): flat 2*16 + 2*4 + 2 = 42.
        assert_eq!(slice[7], 42.0);
    }

    #[test]
    fn test_factor_one_is_identity() {
        let device = Default::default();
        let data: Vec<f32> = (0..27).map(|v| v as f32).collect();
        let image = Image::new(
            Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new([3, 3, 3])), &device),
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
        );

        let result = DownsampleFilter::new(vec![1, 1, 1]).apply(&image);
        assert_eq!(
            result.data().clone().into_data(),
            image.data().clone().into_data()
        );
        assert_eq!(result.grid(), image.grid());
    }
}
