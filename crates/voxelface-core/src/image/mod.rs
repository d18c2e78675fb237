//! Image types and operations.
//!
//! [`Image`] combines tensor voxel data with the physical-space metadata
//! (origin, spacing, direction) that maps voxel indices to mm coordinates.
//! [`ImageGrid`] captures that sampling geometry on its own, so filters can
//! describe and compare output grids without carrying voxel data around.

pub mod image;
pub mod grid;

pub use image::Image;
pub use grid::{ImageGrid, generate_grid, generate_grid_strided};
