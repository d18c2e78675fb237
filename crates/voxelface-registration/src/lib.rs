pub mod error;
pub mod metric;
pub mod optimizer;
pub mod registration;

pub use error::{RegistrationError, Result};
pub use metric::{Metric, MutualInformation, NormalizedCrossCorrelation};
pub use optimizer::{CostFunction, PatternSearchOptions, PatternSearchResult, minimize};
pub use registration::{AffineRegistration, RegistrationSchedule, TransformModel};
