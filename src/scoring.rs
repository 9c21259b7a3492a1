//! HTTP client for the external scoring oracle

use crate::config::ScoringConfig;
use crate::types::features::FeatureVector;
use crate::types::verdict::Classification;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure modes of a scoring call. Neither variant may escape the per-record
/// boundary; the stream processor decides how to degrade.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Transport-level failure: endpoint unreachable or request timed out
    #[error("scoring endpoint unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    /// Endpoint answered with a non-success status
    #[error("scoring endpoint returned {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    req: &'a FeatureVector,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    prediction: String,
    score: f64,
}

/// Synchronous (one round-trip per record) client for the scoring oracle.
#[derive(Clone)]
pub struct ScoringClient {
    client: reqwest::Client,
    url: String,
}

impl ScoringClient {
    /// Build a client with the configured endpoint and a bounded request
    /// timeout.
    pub fn new(config: &ScoringConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Score a feature vector. Returns the classification and the model's
    /// opaque numeric score.
    pub async fn score(
        &self,
        features: &FeatureVector,
    ) -> Result<(Classification, f64), ScoringError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ScoreRequest { req: features })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Rejected { status, body });
        }

        let parsed: ScoreResponse = response.json().await?;
        debug!(prediction = %parsed.prediction, score = parsed.score, "Scoring response");

        Ok((Classification::from_label(&parsed.prediction), parsed.score))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let features = FeatureVector {
            src_bytes: 491.0,
            dst_bytes: 0.0,
            duration: 0.0,
            count: 1.0,
            srv_count: 0.0,
        };
        let json = serde_json::to_string(&ScoreRequest { req: &features }).unwrap();
        assert_eq!(
            json,
            r#"{"req":{"src_bytes":491.0,"dst_bytes":0.0,"duration":0.0,"count":1.0,"srv_count":0.0}}"#
        );
    }

    #[test]
    fn test_response_parsing() {
        let parsed: ScoreResponse =
            serde_json::from_str(r#"{"prediction": "Anomaly", "score": -5}"#).unwrap();
        assert_eq!(parsed.prediction, "Anomaly");
        assert_eq!(parsed.score, -5.0);
        assert!(Classification::from_label(&parsed.prediction).is_anomaly());
    }

    #[test]
    fn test_response_with_extra_fields() {
        // The oracle echoes the input back; extra fields must not break parsing
        let body = r#"{"prediction": "Normal", "score": 1, "input_echo": {"src_bytes": 0}}"#;
        let parsed: ScoreResponse = serde_json::from_str(body).unwrap();
        assert!(!Classification::from_label(&parsed.prediction).is_anomaly());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let client = ScoringClient::new(&ScoringConfig {
            // Port 1 has no listener; connect fails fast
            url: "http://127.0.0.1:1/predict".to_string(),
            timeout_ms: 250,
        })
        .unwrap();

        let features = FeatureVector {
            src_bytes: 0.0,
            dst_bytes: 0.0,
            duration: 0.0,
            count: 0.0,
            srv_count: 0.0,
        };
        let err = client.score(&features).await.unwrap_err();
        assert!(matches!(err, ScoringError::Unavailable(_)));
    }
}
