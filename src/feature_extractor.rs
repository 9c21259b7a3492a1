//! Feature extraction for anomaly-model inference.
//!
//! Derives the model input vector from a raw traffic record plus the live
//! window count. Field order matches the order used during model training.

use crate::types::features::FeatureVector;
use crate::types::record::TrafficRecord;

/// Extractor that turns raw records into model input features.
///
/// Pure function of its inputs: no I/O, no state. `count` comes from the live
/// rate counter; `srv_count` is read from the record itself, as only the
/// traffic-class rate is derived live.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the five-field feature vector from a record and the current
    /// window count. Default-on-missing semantics are applied upstream when
    /// the record is deserialized.
    pub fn extract(&self, record: &TrafficRecord, live_count: u64) -> FeatureVector {
        FeatureVector {
            src_bytes: record.src_bytes,
            dst_bytes: record.dst_bytes,
            duration: record.duration,
            count: live_count as f64,
            srv_count: record.srv_count,
        }
    }

    /// Number of features produced.
    pub fn feature_count(&self) -> usize {
        FeatureVector::FIELD_NAMES.len()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> TrafficRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_http_syn_scan_record() {
        let extractor = FeatureExtractor::new();
        let record = record(
            r#"{"packet_id": "p1", "src_bytes": 491, "dst_bytes": 0,
                "duration": 0, "service": "http", "flag": "S0"}"#,
        );

        let features = extractor.extract(&record, 1);
        assert_eq!(features.to_array(), [491.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_numerics_extract_to_zero() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&record("{}"), 0);
        assert_eq!(features.to_array(), [0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_live_count_overrides_record_count() {
        let extractor = FeatureExtractor::new();
        // Record carries count=7 but the live window says 3
        let record = record(r#"{"packet_id": "p1", "count": 7, "srv_count": 4}"#);
        let features = extractor.extract(&record, 3);
        assert_eq!(features.count, 3.0);
        assert_eq!(features.srv_count, 4.0);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = FeatureExtractor::new();
        let record = record(r#"{"packet_id": "p1", "src_bytes": 200, "duration": 0.1}"#);
        let first = extractor.extract(&record, 5);
        let second = extractor.extract(&record, 5);
        assert_eq!(first, second);
    }
}
