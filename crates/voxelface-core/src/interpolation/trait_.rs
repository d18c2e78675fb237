//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Samples a tensor at continuous (non-integer) indices.
///
/// Out-of-bounds coordinates are clamped to the nearest edge voxel; the
/// resample filter decides separately whether a sample falls outside the
/// source extent and substitutes its background value there.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a tensor at the given continuous indices.
    ///
    /// # Arguments
    /// * `data` - The source tensor, `[Z, Y, X]` for volumes
    /// * `indices` - Continuous indices `[Batch, Rank]` in `(x, y, z)` order
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>)
        -> Tensor<B, 1>;
}
