//! Normalized cross correlation metric.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxelface_core::image::{Image, generate_grid_strided};
use voxelface_core::interpolation::{Interpolator, LinearInterpolator, NearestNeighborInterpolator};
use voxelface_core::transform::Transform;
use super::trait_::Metric;

/// Zero-normalized cross correlation:
///
/// `NCC = sum(Fc * Mc) / sqrt(sum(Fc^2) * sum(Mc^2))`
///
/// with `Fc`, `Mc` the mean-centered fixed and warped-moving samples.
/// Invariant to linear intensity rescaling, which makes it robust across
/// subjects of the same contrast. The loss is `-NCC` (minimize).
pub struct NormalizedCrossCorrelation {
    interpolator: LinearInterpolator,
}

impl NormalizedCrossCorrelation {
    pub fn new() -> Self {
        Self {
            interpolator: LinearInterpolator::new(),
        }
    }
}

impl Default for NormalizedCrossCorrelation {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend, const D: usize> Metric<B, D> for NormalizedCrossCorrelation {
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
        let n = sample_indices.dims()[0];

        // Integer sample indices, so nearest neighbor reads exact values.
        let fixed_values =
            NearestNeighborInterpolator::new().interpolate(fixed.data(), sample_indices.clone());

        let fixed_points = fixed.index_to_world_tensor(sample_indices);
        let moving_points = transform.transform_points(fixed_points);
        let moving_indices = moving.world_to_index_tensor(moving_points);
        let moving_values = self.interpolator.interpolate(moving.data(), moving_indices);

        let mean_f = fixed_values.clone().sum() / (n as f32);
        let mean_m = moving_values.clone().sum() / (n as f32);

        let f_centered = fixed_values - mean_f;
        let m_centered = moving_values - mean_m;

        let numerator = (f_centered.clone() * m_centered.clone()).sum();
        let denom_f = f_centered.powf_scalar(2.0).sum();
        let denom_m = m_centered.powf_scalar(2.0).sum();

        let denominator = (denom_f * denom_m).sqrt() + 1e-10;
        (numerator / denominator).neg()
    }

    fn name(&self) -> &'static str {
        "NormalizedCrossCorrelation"
    }
}
