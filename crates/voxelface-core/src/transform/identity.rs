//! Identity transform.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use super::trait_::Transform;

/// The identity map. Used for resampling without a geometric transform,
/// e.g. pure grid changes in the voxelator.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl IdentityTransform {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for IdentityTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        points
    }
}
