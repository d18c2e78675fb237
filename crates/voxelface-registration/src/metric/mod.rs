//! Similarity metrics for registration.

pub mod trait_;
pub mod ncc;
pub mod mutual_information;

pub use trait_::Metric;
pub use ncc::NormalizedCrossCorrelation;
pub use mutual_information::MutualInformation;
