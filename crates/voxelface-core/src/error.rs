//! Error types for core image operations.

use thiserror::Error;

/// Error type for image construction and filtering.
#[derive(Error, Debug)]
pub enum ImageError {
    /// An input volume has unusable geometry (zero/negative spacing,
    /// degenerate direction, empty extent, ...).
    #[error("invalid input geometry: {0}")]
    InvalidInputGeometry(String),

    /// Two images that must share a voxel grid do not.
    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    /// Filter or operation parameters are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ImageError {
    /// Construct an [`ImageError::InvalidInputGeometry`].
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidInputGeometry(msg.into())
    }

    /// Construct an [`ImageError::GridMismatch`].
    pub fn grid_mismatch(msg: impl Into<String>) -> Self {
        Self::GridMismatch(msg.into())
    }

    /// Construct an [`ImageError::InvalidConfiguration`].
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// Result type for core image operations.
pub type Result<T> = std::result::Result<T, ImageError>;
