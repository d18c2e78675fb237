//! Metric trait for image similarity measurement.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use voxelface_core::image::Image;
use voxelface_core::transform::Transform;

/// Measures dissimilarity between a fixed and a transformed moving image.
///
/// The transform maps fixed-space physical points into moving space; the
/// metric samples the moving image there and compares against the fixed
/// intensities. Lower values mean better alignment, so optimizers minimize.
///
/// `sample_stride` selects every Nth fixed voxel along each axis as the
/// evaluation set. The subset is deterministic, so repeated evaluations of
/// the same transform give identical loss values. Stride 1 uses every voxel.
pub trait Metric<B: Backend, const D: usize> {
    /// Loss (dissimilarity) of `moving` under `transform` against `fixed`.
    ///
    /// # Returns
    /// Scalar tensor holding the loss value
    fn forward(
        &self,
        fixed: &Image<B, D>,
        moving: &Image<B, D>,
        transform: &impl Transform<B, D>,
        sample_stride: usize,
    ) -> Tensor<B, 1>;

    /// Name of this metric, for logs.
    fn name(&self) -> &'static str;
}
