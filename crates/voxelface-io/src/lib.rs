pub mod error;
pub mod nifti_io;

pub use error::{IoError, Result};
pub use nifti_io::{read_nifti, write_nifti};
