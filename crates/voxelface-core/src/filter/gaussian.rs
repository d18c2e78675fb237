//! Separable Gaussian smoothing.

use std::marker::PhantomData;
use burn::tensor::{Tensor, Shape};
use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use crate::image::Image;
use crate::spatial::Spacing;

const MAX_KERNEL_RADIUS: usize = 16;

/// Gaussian smoothing via separable 1-D convolutions.
///
/// Sigmas are physical (mm), ordered `(x, y, z)` like spacing; the kernel
/// width per axis adapts to the image spacing. Used to band-limit pyramid
/// levels before subsampling.
pub struct GaussianFilter<B: Backend> {
    sigmas: Vec<f64>,
    _backend: PhantomData<B>,
}

impl<B: Backend> GaussianFilter<B> {
    /// Create a Gaussian filter with per-axis standard deviations in mm.
    pub fn new(sigmas: Vec<f64>) -> Self {
        Self {
            sigmas,
            _backend: PhantomData,
        }
    }

    /// Smooth an image, preserving its grid.
    pub fn apply<const D: usize>(&self, image: &Image<B, D>) -> Image<B, D> {
        let data = self.apply_tensor(image.data().clone(), image.spacing());
        Image::new(data, *image.origin(), *image.spacing(), *image.direction())
    }

    /// Smooth a raw tensor given the physical spacing of its grid.
    pub fn apply_tensor<const D: usize>(
        &self,
        input: Tensor<B, D>,
        spacing: &Spacing<D>,
    ) -> Tensor<B, D> {
        let mut data = input;

        for dim in 0..D {
            // Tensor dims are [Z, Y, X]; sigma/spacing components (x, y, z).
            let axis = D - 1 - dim;
            let sigma = if axis < self.sigmas.len() {
                self.sigmas[axis]
            } else {
                self.sigmas[0]
            };
            if sigma <= 1e-6 {
                continue;
            }

            let pixel_sigma = sigma / spacing[axis];
            let radius = ((3.0 * pixel_sigma).ceil() as usize).clamp(1, MAX_KERNEL_RADIUS);
            let kernel = gaussian_kernel(pixel_sigma, radius);

            data = convolve_axis(data, &kernel, dim);
        }
        data
    }
}

/// Normalized 1-D Gaussian taps for the given sigma (in voxels) and radius.
fn gaussian_kernel(sigma: f64, radius: usize) -> Vec<f32> {
    let two_sigma2 = 2.0 * sigma * sigma;
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let mut sum = 0.0;

    for i in 0..=(2 * radius) {
        let x = i as f64 - radius as f64;
        let value = (-x * x / two_sigma2).exp();
        kernel.push(value as f32);
        sum += value;
    }
    for value in &mut kernel {
        *value /= sum as f32;
    }
    kernel
}

/// Convolve along one tensor dimension with a same-size 1-D kernel.
///
/// The target dimension is swapped to the back, the rest flattened into a
/// batch, and the work done by a single `conv1d` call.
fn convolve_axis<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    kernel: &[f32],
    dim: usize,
) -> Tensor<B, D> {
    let device = input.device();
    let dims: [usize; D] = input.shape().dims();

    let swapped = if dim == D - 1 {
        input
    } else {
        input.swap_dims(dim, D - 1)
    };
    let swapped_dims: [usize; D] = swapped.shape().dims();

    let length = swapped_dims[D - 1];
    let batch: usize = swapped_dims[..D - 1].iter().product();

    let reshaped = swapped.reshape([batch, 1, length]);

    let kernel_size = kernel.len();
    let kernel_tensor = Tensor::<B, 1>::from_floats(kernel, &device).reshape([1, 1, kernel_size]);

    // Odd kernel + this padding preserves the length.
    let padding = kernel_size / 2;
    let options = ConvOptions::new([1], [padding], [1], 1);
    let convolved = burn::tensor::module::conv1d(reshaped, kernel_tensor, None, options);

    let restored = convolved.reshape(Shape::new(swapped_dims));
    if dim == D - 1 {
        restored
    } else {
        // Swapping the same pair again restores the original order.
        let out = restored.swap_dims(dim, D - 1);
        let out_dims: [usize; D] = out.shape().dims();
        debug_assert_eq!(out_dims, dims);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use burn::tensor::TensorData;
    use crate::spatial::{Point, Direction};

    type B = NdArray<f32>;

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(1.5, 4);
        assert_eq!(kernel.len(), 9);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..4 {
            assert!((kernel[i] - kernel[8 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_constant_volume_unchanged() {
        let device = Default::default();
        let data = Tensor::<B, 3>::ones([6, 6, 6], &device) * 3.0;
        let image = Image::new(
            data,
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
        );

        let smoothed = GaussianFilter::new(vec![1.0, 1.0, 1.0]).apply(&image);
        let out = smoothed.data().clone().into_data();
        // Interior voxels of a constant volume stay constant.
        let slice = out.as_slice::<f32>().unwrap();
        let center = 3 * 36 + 3 * 6 + 3;
        assert!((slice[center] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_smoothing_spreads_an_impulse() {
        let device = Default::default();
        let mut data = vec![0.0f32; 125];
        data[2 * 25 + 2 * 5 + 2] = 1.0;
        let image = Image::new(
            Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new([5, 5, 5])), &device),
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
        );

        let smoothed = GaussianFilter::new(vec![1.0, 1.0, 1.0]).apply(&image);
        let out = smoothed.data().clone().into_data();
        let slice = out.as_slice::<f32>().unwrap();

        let center = 2 * 25 + 2 * 5 + 2;
        let neighbor = 2 * 25 + 2 * 5 + 3;
        assert!(slice[center] < 1.0);
        assert!(slice[neighbor] > 0.0);
        assert!(slice[center] > slice[neighbor]);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let device = Default::default();
        let data: Vec<f32> = (0..27).map(|v| v as f32).collect();
        let image = Image::new(
            Tensor::<B, 3>::from_data(
                TensorData::new(data, Shape::new([3, 3, 3])),
                &device,
            ),
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
        );

        let smoothed = GaussianFilter::new(vec![0.0, 0.0, 0.0]).apply(&image);
        assert_eq!(
            smoothed.data().clone().into_data(),
            image.data().clone().into_data()
        );
    }
}
