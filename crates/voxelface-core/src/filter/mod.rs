//! Volume filters.
//!
//! Every filter is a pure function of its inputs: it reads immutable
//! volumes and returns a new [`crate::image::Image`]. Resampling, voxelation
//! and compositing are the building blocks of the defacing pipeline;
//! gaussian smoothing, subsampling and the pyramid support registration.

pub mod resample;
pub mod voxelate;
pub mod composite;
pub mod gaussian;
pub mod downsample;
pub mod pyramid;

pub use resample::ResampleImageFilter;
pub use voxelate::VoxelateFilter;
pub use composite::CompositeFilter;
pub use gaussian::GaussianFilter;
pub use downsample::DownsampleFilter;
pub use pyramid::MultiResolutionPyramid;
