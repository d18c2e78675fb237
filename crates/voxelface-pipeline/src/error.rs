//! Error type for the defacing pipeline.

use thiserror::Error;
use voxelface_core::ImageError;
use voxelface_registration::RegistrationError;

/// Any failure along the pipeline. All variants abort the run; no stage
/// falls back to a partial result.
#[derive(Error, Debug)]
pub enum DefaceError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, DefaceError>;
