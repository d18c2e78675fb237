pub mod error;
pub mod pipeline;

pub use error::{DefaceError, Result};
pub use pipeline::{DefaceConfig, DefaceOutput, DefacePipeline, MetricKind};
pub use voxelface_registration::TransformModel;
