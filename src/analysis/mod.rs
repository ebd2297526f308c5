//! Analysis modules.
//!
//! Aggregation over the loaded event table and the text derived from it.

pub mod aggregator;
pub mod recommendations;

pub use aggregator::*;
pub use recommendations::{synthesize, RecommendationSection, Recommendations, TextBlock};
