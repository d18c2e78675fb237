//! Mutual information metric with soft (Parzen window) histograms.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxelface_core::image::{Image, generate_grid_strided};
use voxelface_core::interpolation::{Interpolator, LinearInterpolator, NearestNeighborInterpolator};
use voxelface_core::transform::Transform;
use super::trait_::Metric;

/// Mutual information:
///
/// `MI(F, M) = H(F) + H(M) - H(F, M)`
///
/// estimated from Gaussian-smoothed histograms over intensities normalized
/// to `[0, 1]`. Makes no assumption about the intensity relationship
/// between the two images, so it tolerates template-vs-subject contrast
/// differences better than correlation. The loss is `-MI` (minimize).
pub struct MutualInformation {
    interpolator: LinearInterpolator,
    num_bins: usize,
    sigma: f64,
}

impl MutualInformation {
    /// Create a mutual information metric.
    ///
    /// # Arguments
    /// * `num_bins` - histogram bins over the normalized intensity range
    /// * `sigma` - Parzen kernel width in normalized intensity units
    pub fn new(num_bins: usize, sigma: f64) -> Self {
        Self {
            interpolator: LinearInterpolator::new(),
            num_bins,
            sigma,
        }
    }

    fn bin_centers<B: Backend>(&self, device: &B::Device) -> Tensor<B, 1> {
        let centers: Vec<f32> = (0..self.num_bins)
            .map(|i| (i as f32 + 0.5) / self.num_bins as f32)
            .collect();
        Tensor::<B, 1>::from_floats(centers.as_slice(), device)
    }

    /// Normalize values to `[0, 1]` by their own min/max.
    fn normalize<B: Backend>(values: Tensor<B, 1>) -> Tensor<B, 1> {
        let min = values.clone().min();
        let range = values.clone().max() - min.clone() + 1e-6;
        (values - min) / range
    }

    /// Soft histogram `[num_bins]`, normalized to a probability vector.
    fn soft_histogram<B: Backend>(&self, values: Tensor<B, 1>, bins: &Tensor<B, 1>) -> Tensor<B, 1> {
        let n = values.dims()[0];
        let num_bins = bins.dims()[0];

        let diff = values.reshape([n, 1]) - bins.clone().reshape([1, num_bins]);
        let weights = (diff.powf_scalar(2.0) * (-0.5 / (self.sigma * self.sigma))).exp();

        let histogram = weights.sum_dim(0).reshape([num_bins]);
        let total = histogram.clone().sum() + 1e-10;
        histogram / total
    }

    /// Joint soft histogram `[num_bins, num_bins]` as a probability matrix.
    ///
    /// Entry (i, j) is `sum_k w_f(k, i) * w_m(k, j)`, i.e. `W_f^T @ W_m`.
    fn joint_histogram<B: Backend>(
        &self,
        values_f: Tensor<B, 1>,
        values_m: Tensor<B, 1>,
        bins: &Tensor<B, 1>,
    ) -> Tensor<B, 2> {
        let n = values_f.dims()[0];
        let num_bins = bins.dims()[0];
        let scale = -0.5 / (self.sigma * self.sigma);

        let diff_f = values_f.reshape([n, 1]) - bins.clone().reshape([1, num_bins]);
        let weights_f = (diff_f.powf_scalar(2.0) * scale).exp();

        let diff_m = values_m.reshape([n, 1]) - bins.clone().reshape([1, num_bins]);
        let weights_m = (diff_m.powf_scalar(2.0) * scale).exp();

        let joint = weights_f.transpose().matmul(weights_m);
        let total = joint.clone().sum() + 1e-10;
        joint / total.reshape([1, 1])
    }

    /// Shannon entropy of a probability distribution.
    fn entropy<B: Backend, const D: usize>(probs: Tensor<B, D>) -> Tensor<B, 1> {
        let log_probs = (probs.clone() + 1e-10).log();
        (probs * log_probs).sum().neg()
    }
}

impl Default for MutualInformation {
    fn default() -> Self {
        Self::new(32, 0.05)
    }
}

impl<B: Backend, const D: usize> Metric<B, D> for MutualInformation {
    fn forward(
        &self,
        fixed: &Image<B, D>,
        moving: &Image<B, D>,
        transform: &impl Transform<B, D>,
        sample_stride: usize,
    ) -> Tensor<B, 1> {
        let device = fixed.data().device();

        let sample_indices =
            generate_grid_strided::<B, D>(fixed.shape(), sample_stride.max(1), &device);

        let fixed_values =
            NearestNeighborInterpolator::new().interpolate(fixed.data(), sample_indices.clone());

        let fixed_points = fixed.index_to_world_tensor(sample_indices);
        let moving_points = transform.transform_points(fixed_points);
        let moving_indices = moving.world_to_index_tensor(moving_points);
        let moving_values = self.interpolator.interpolate(moving.data(), moving_indices);

        let f_norm = Self::normalize(fixed_values);
        let m_norm = Self::normalize(moving_values);

        let bins = self.bin_centers::<B>(&device);
        let hist_f = self.soft_histogram(f_norm.clone(), &bins);
        let hist_m = self.soft_histogram(m_norm.clone(), &bins);
        let joint = self.joint_histogram(f_norm, m_norm, &bins);

        let mi = Self::entropy(hist_f) + Self::entropy(hist_m) - Self::entropy(joint);
        mi.neg()
    }

    fn name(&self) -> &'static str {
        "MutualInformation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use burn::tensor::{TensorData, Shape};
    use voxelface_core::spatial::{Point, Spacing, Direction};
    use voxelface_core::transform::IdentityTransform;

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
    fn test_aligned_beats_misaligned() {
        // Structured volume vs itself, and vs a scrambled copy.
        let data: Vec<f32> = (0..1000).map(|v| ((v / 100) % 4) as f32 * 25.0).collect();
        let scrambled: Vec<f32> = (0..1000).map(|v| ((v * 7 + 3) % 101) as f32).collect();

        let fixed = make_image(data.clone(), [10, 10, 10]);
        let aligned = make_image(data, [10, 10, 10]);
        let mismatched = make_image(scrambled, [10, 10, 10]);

        let metric = MutualInformation::default();
        let loss_aligned = metric
            .forward(&fixed, &aligned, &IdentityTransform::new(), 1)
            .into_scalar();
        let loss_mismatched = metric
            .forward(&fixed, &mismatched, &IdentityTransform::new(), 1)
            .into_scalar();

        assert!(
            loss_aligned < loss_mismatched,
            "aligned loss {} should beat mismatched loss {}",
            loss_aligned,
            loss_mismatched
        );
    }

    #[test]
    fn test_invariant_to_intensity_remapping() {
        // MI sees a one-to-one intensity remap as just as informative.
        let data: Vec<f32> = (0..1000).map(|v| ((v / 50) % 5) as f32).collect();
        let remapped: Vec<f32> = data.iter().map(|v| 100.0 - 20.0 * v).collect();

        let fixed = make_image(data.clone(), [10, 10, 10]);
        let same = make_image(data, [10, 10, 10]);
        let moving = make_image(remapped, [10, 10, 10]);

        let metric = MutualInformation::default();
        let loss_same = metric
            .forward(&fixed, &same, &IdentityTransform::new(), 1)
            .into_scalar();
        let loss_remapped = metric
            .forward(&fixed, &moving, &IdentityTransform::new(), 1)
            .into_scalar();

        assert!((loss_same - loss_remapped).abs() < 0.05);
    }
}
