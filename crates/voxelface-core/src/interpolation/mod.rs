//! Interpolation kernels for sampling volumes at continuous coordinates.

pub mod trait_;
pub mod nearest;
pub mod linear;
pub mod bspline;

pub use trait_::Interpolator;
pub use nearest::NearestNeighborInterpolator;
pub use linear::LinearInterpolator;
pub use bspline::BSplineInterpolator;
