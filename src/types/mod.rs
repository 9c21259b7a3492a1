//! Type definitions for the sentinel pipeline

pub mod features;
pub mod record;
pub mod verdict;

pub use features::{FeatureRow, FeatureVector};
pub use record::TrafficRecord;
pub use verdict::{Classification, ScoringOutcome};
