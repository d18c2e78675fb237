//! Error types for registration.

use thiserror::Error;
use voxelface_core::ImageError;

/// Error type for the transform estimator.
///
/// All variants are unrecoverable for the current run: the caller reports
/// and exits. In particular a failed registration never falls back to the
/// identity transform, which would silently leave facial anatomy intact.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// An input volume has unusable geometry. Raised before any
    /// optimization iteration runs.
    #[error("invalid input geometry: {0}")]
    InvalidInputGeometry(String),

    /// The optimizer finished all levels without improving the similarity
    /// metric over the identity transform.
    #[error("registration diverged: {0}")]
    Divergence(String),

    /// The deadline expired between optimizer iterations.
    #[error("registration timed out: {0}")]
    Timeout(String),

    /// Schedule or optimizer parameters are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<ImageError> for RegistrationError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidInputGeometry(msg) => Self::InvalidInputGeometry(msg),
            ImageError::GridMismatch(msg) => Self::InvalidInputGeometry(msg),
            ImageError::InvalidConfiguration(msg) => Self::InvalidConfiguration(msg),
        }
    }
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;
