//! Per-record stream processing.
//!
//! Each record goes through the same sequence: rate count, feature
//! extraction, durable feature logging, best-effort store mirroring, scoring,
//! prediction logging, alerting. Every step below the record boundary
//! recovers locally; one bad record must never stop the stream.

use crate::counter::RateCounter;
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::PipelineMetrics;
use crate::scoring::ScoringClient;
use crate::sink::{FeatureStoreMirror, ResultSink};
use crate::types::features::FeatureRow;
use crate::types::record::TrafficRecord;
use crate::types::verdict::ScoringOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Orchestrator driving one record through the pipeline components.
pub struct StreamProcessor {
    extractor: FeatureExtractor,
    counter: RateCounter,
    scoring: ScoringClient,
    sink: Arc<ResultSink>,
    mirror: FeatureStoreMirror,
    metrics: Arc<PipelineMetrics>,
}

impl StreamProcessor {
    pub fn new(
        extractor: FeatureExtractor,
        counter: RateCounter,
        scoring: ScoringClient,
        sink: Arc<ResultSink>,
        mirror: FeatureStoreMirror,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            extractor,
            counter,
            scoring,
            sink,
            mirror,
            metrics,
        }
    }

    /// Process one raw payload from the transport.
    ///
    /// Returns `Err` only for failures worth logging at the record boundary
    /// (deserialization of non-JSON payloads, log-write failures). Degraded
    /// steps such as an offline counter, an unavailable scoring oracle, or a
    /// dead mirror are handled inside and produce `Ok`.
    pub async fn process_payload(&self, payload: &[u8]) -> Result<()> {
        let start_time = std::time::Instant::now();

        let record: TrafficRecord = match serde_json::from_slice(payload) {
            Ok(record) => record,
            Err(e) => {
                self.metrics.record_skipped();
                return Err(e).context("Failed to deserialize record");
            }
        };

        let Some(packet_id) = record.packet_id.clone() else {
            warn!("Record without a usable packet_id, skipping");
            self.metrics.record_skipped();
            return Ok(());
        };

        // Live traffic-class rate; degrades to 0 when the backend is away.
        let live_count = self.counter.increment(&record.window_key()).await;

        let features = self.extractor.extract(&record, live_count);
        let event_timestamp = Utc::now();

        // Features are persisted before scoring so a scoring failure still
        // leaves the record in the training data.
        self.sink
            .record_features(&features)
            .context("Failed to append feature log")?;

        if self.mirror.is_enabled() {
            let mirror = self.mirror.clone();
            let metrics = self.metrics.clone();
            let row = FeatureRow::new(&record, &packet_id, features, event_timestamp);
            tokio::spawn(async move {
                if let Err(e) = mirror.push(&row).await {
                    metrics.record_mirror_failure();
                    warn!(packet_id = %row.packet_id, error = %e, "Feature store mirror failed");
                }
            });
        }

        match self.scoring.score(&features).await {
            Ok((classification, score)) => {
                let outcome = ScoringOutcome {
                    packet_id: packet_id.clone(),
                    timestamp: event_timestamp,
                    classification,
                    score,
                };
                self.sink
                    .record_prediction(&outcome)
                    .context("Failed to append prediction log")?;

                if classification.is_anomaly() {
                    error!(
                        packet_id = %packet_id,
                        score = score,
                        "ALERT! Anomaly detected"
                    );
                } else {
                    info!(packet_id = %packet_id, "Record is normal");
                }

                self.metrics
                    .record_processed(start_time.elapsed(), classification.is_anomaly());
            }
            Err(e) => {
                // Prediction dropped; features already persisted above.
                error!(packet_id = %packet_id, error = %e, "Scoring failed");
                self.metrics.record_scoring_failure();
                self.metrics.record_processed(start_time.elapsed(), false);
            }
        }

        Ok(())
    }
}
