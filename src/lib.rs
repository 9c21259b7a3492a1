//! Sentinel Pipeline Library
//!
//! A real-time network-traffic anomaly-detection pipeline: records stream in
//! over NATS, gain a live windowed rate count, are scored by an external
//! anomaly model, and land in append-only logs with per-record failure
//! isolation.

pub mod config;
pub mod consumer;
pub mod counter;
pub mod feature_extractor;
pub mod metrics;
pub mod processor;
pub mod scoring;
pub mod sink;
pub mod types;

pub use config::AppConfig;
pub use consumer::RecordConsumer;
pub use counter::RateCounter;
pub use feature_extractor::FeatureExtractor;
pub use processor::StreamProcessor;
pub use scoring::ScoringClient;
pub use sink::{FeatureStoreMirror, ResultSink};
pub use types::{Classification, FeatureVector, ScoringOutcome, TrafficRecord};
