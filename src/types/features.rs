//! Feature vector and feature-store row types

use crate::types::record::TrafficRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-order numeric features fed to the scoring oracle.
///
/// Field order matches the order used at model training time; reordering
/// silently corrupts scoring, so the declaration order here is the contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub src_bytes: f64,
    pub dst_bytes: f64,
    pub duration: f64,
    pub count: f64,
    pub srv_count: f64,
}

impl FeatureVector {
    /// Column names in training order, used as the feature-log CSV header.
    pub const FIELD_NAMES: [&'static str; 5] =
        ["src_bytes", "dst_bytes", "duration", "count", "srv_count"];

    /// Values in training order.
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.src_bytes,
            self.dst_bytes,
            self.duration,
            self.count,
            self.srv_count,
        ]
    }

    /// One feature-log CSV row (no trailing newline).
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.src_bytes, self.dst_bytes, self.duration, self.count, self.srv_count
        )
    }
}

/// Enriched feature row pushed to the feature-store mirror: the feature vector
/// plus record identity, event timestamp, and categorical metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub packet_id: String,
    pub event_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub features: FeatureVector,
    pub protocol_type: String,
    pub service: String,
    pub flag: String,
}

impl FeatureRow {
    pub fn new(
        record: &TrafficRecord,
        packet_id: &str,
        features: FeatureVector,
        event_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            packet_id: packet_id.to_string(),
            event_timestamp,
            features,
            protocol_type: record.protocol_type.clone(),
            service: record.service.clone(),
            flag: record.flag.clone(),
        }
    }
}
