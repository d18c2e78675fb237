//! Error types for volume I/O.

use thiserror::Error;

/// Error type for reading and writing volume files.
#[derive(Error, Debug)]
pub enum IoError {
    /// The file could not be parsed as a NIfTI volume.
    #[error("unsupported volume format: {0}")]
    UnsupportedVolumeFormat(#[from] nifti::NiftiError),

    /// The file parsed, but does not hold a 3-D scalar volume.
    #[error("expected a 3-D scalar volume, found {0} dimensions")]
    UnsupportedDimensionality(usize),

    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The in-memory volume could not be serialized.
    #[error("failed to write volume: {0}")]
    Write(String),
}

/// Result type for volume I/O.
pub type Result<T> = std::result::Result<T, IoError>;
