//! Derivative-free optimization for transform parameters.

pub mod trait_;
pub mod pattern_search;

pub use trait_::CostFunction;
pub use pattern_search::{PatternSearchOptions, PatternSearchResult, minimize};
