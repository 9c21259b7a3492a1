//! Durable result sink and best-effort feature-store mirror.
//!
//! The sink exclusively owns two append-only CSV logs: the feature log feeds
//! offline retraining, the prediction log feeds monitoring. Each row is
//! flushed and fsynced before the write returns so a crash cannot silently
//! drop rows. Rotation and retention are operational concerns, not handled
//! here.

use crate::config::{MirrorConfig, SinkConfig};
use crate::types::features::{FeatureRow, FeatureVector};
use crate::types::verdict::ScoringOutcome;
use anyhow::{Context, Result};
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Append-only writer for the feature and prediction logs.
pub struct ResultSink {
    feature_log: PathBuf,
    prediction_log: PathBuf,
    // One lock per destination file so concurrent record tasks cannot
    // interleave lines within this process.
    feature_lock: Mutex<()>,
    prediction_lock: Mutex<()>,
}

impl ResultSink {
    pub fn new(config: &SinkConfig) -> Result<Self> {
        let data_dir = PathBuf::from(&config.data_dir);
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        Ok(Self {
            feature_log: data_dir.join(&config.feature_log),
            prediction_log: data_dir.join(&config.prediction_log),
            feature_lock: Mutex::new(()),
            prediction_lock: Mutex::new(()),
        })
    }

    /// Append one row to the feature log, writing the header first when the
    /// file does not exist yet.
    pub fn record_features(&self, features: &FeatureVector) -> Result<()> {
        let _guard = self.feature_lock.lock().unwrap();
        append_row(
            &self.feature_log,
            &FeatureVector::FIELD_NAMES.join(","),
            &features.csv_row(),
        )
    }

    /// Append one row to the prediction log under the same durability
    /// contract.
    pub fn record_prediction(&self, outcome: &ScoringOutcome) -> Result<()> {
        let _guard = self.prediction_lock.lock().unwrap();
        append_row(
            &self.prediction_log,
            ScoringOutcome::CSV_HEADER,
            &outcome.csv_row(),
        )
    }

    pub fn feature_log_path(&self) -> &Path {
        &self.feature_log
    }

    pub fn prediction_log_path(&self) -> &Path {
        &self.prediction_log
    }
}

fn append_row(path: &Path, header: &str, row: &str) -> Result<()> {
    let needs_header = !path.exists();

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    if needs_header {
        writeln!(file, "{header}")?;
    }
    writeln!(file, "{row}")?;

    file.flush()?;
    file.sync_all()
        .with_context(|| format!("Failed to fsync {}", path.display()))?;

    Ok(())
}

/// Best-effort push of enriched feature rows to the external feature store.
///
/// Failures here are the mirror's own problem: the processor fires pushes as
/// detached tasks and only logs errors, so a slow or dead store cannot add
/// latency or failure coupling to the scoring path.
#[derive(Clone)]
pub struct FeatureStoreMirror {
    client: reqwest::Client,
    push_url: String,
    source_name: String,
    enabled: bool,
}

impl FeatureStoreMirror {
    pub fn new(config: &MirrorConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(5))
                .build()?,
            push_url: config.push_url.clone(),
            source_name: config.source_name.clone(),
            enabled: config.enabled,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Push a batch of one row in the store's push-source shape.
    pub async fn push(&self, row: &FeatureRow) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let body = json!({
            "push_source_name": self.source_name,
            "df": {
                "packet_id": [row.packet_id],
                "event_timestamp": [row.event_timestamp.to_rfc3339()],
                "src_bytes": [row.features.src_bytes],
                "dst_bytes": [row.features.dst_bytes],
                "duration": [row.features.duration],
                "count": [row.features.count],
                "srv_count": [row.features.srv_count],
                "protocol_type": [row.protocol_type],
                "service": [row.service],
                "flag": [row.flag],
            },
            "to": "online",
        });

        let response = self
            .client
            .post(&self.push_url)
            .json(&body)
            .send()
            .await
            .context("Feature store push failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Feature store rejected push: {status}");
        }

        debug!(packet_id = %row.packet_id, "Features mirrored to store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::verdict::Classification;
    use chrono::{DateTime, Utc};

    fn sink_in(dir: &Path) -> ResultSink {
        ResultSink::new(&SinkConfig {
            data_dir: dir.to_string_lossy().into_owned(),
            feature_log: "live_traffic.csv".to_string(),
            prediction_log: "predictions.csv".to_string(),
        })
        .unwrap()
    }

    fn features() -> FeatureVector {
        FeatureVector {
            src_bytes: 491.0,
            dst_bytes: 0.0,
            duration: 0.0,
            count: 1.0,
            srv_count: 0.0,
        }
    }

    #[test]
    fn test_feature_log_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(dir.path());

        sink.record_features(&features()).unwrap();
        sink.record_features(&features()).unwrap();

        let contents = std::fs::read_to_string(sink.feature_log_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "src_bytes,dst_bytes,duration,count,srv_count");
        assert_eq!(lines[1], "491,0,0,1,0");
        assert_eq!(lines[2], "491,0,0,1,0");
    }

    #[test]
    fn test_prediction_row_shape() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(dir.path());

        let outcome = ScoringOutcome {
            packet_id: "pkt_3".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            classification: Classification::Anomaly,
            score: -5.0,
        };
        sink.record_prediction(&outcome).unwrap();

        let contents = std::fs::read_to_string(sink.prediction_log_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "timestamp,packet_id,prediction,score");
        assert_eq!(lines[1], "2024-01-02T03:04:05+00:00,pkt_3,Anomaly,-5");
    }

    #[test]
    fn test_logs_are_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink_in(dir.path());

        sink.record_features(&features()).unwrap();
        let first = std::fs::read_to_string(sink.feature_log_path()).unwrap();
        sink.record_features(&features()).unwrap();
        let second = std::fs::read_to_string(sink.feature_log_path()).unwrap();

        assert!(second.starts_with(&first));
        assert!(second.len() > first.len());
    }

    #[tokio::test]
    async fn test_disabled_mirror_is_a_noop() {
        let mirror = FeatureStoreMirror::new(&MirrorConfig {
            enabled: false,
            push_url: "http://127.0.0.1:1/push".to_string(),
            source_name: "packet_push_source".to_string(),
        })
        .unwrap();

        let record: crate::types::record::TrafficRecord = serde_json::from_str("{}").unwrap();
        let row = FeatureRow::new(&record, "pkt_1", features(), Utc::now());
        // Would fail if it actually tried the unreachable endpoint
        mirror.push(&row).await.unwrap();
    }
}
