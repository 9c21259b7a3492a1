//! Scoring outcome data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification returned by the scoring oracle.
///
/// Only the literal label "Anomaly" drives alerting; any other label from the
/// oracle is treated as normal traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Normal,
    Anomaly,
}

impl Classification {
    pub fn from_label(label: &str) -> Self {
        if label == "Anomaly" {
            Classification::Anomaly
        } else {
            Classification::Normal
        }
    }

    pub fn is_anomaly(&self) -> bool {
        matches!(self, Classification::Anomaly)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Normal => write!(f, "Normal"),
            Classification::Anomaly => write!(f, "Anomaly"),
        }
    }
}

/// One scored record, appended to the prediction log and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub packet_id: String,
    pub timestamp: DateTime<Utc>,
    pub classification: Classification,
    /// Numeric anomaly score; sign and magnitude conventions belong to the
    /// external model and are carried through opaquely.
    pub score: f64,
}

impl ScoringOutcome {
    /// Prediction-log CSV header.
    pub const CSV_HEADER: &'static str = "timestamp,packet_id,prediction,score";

    /// One prediction-log CSV row (no trailing newline).
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.timestamp.to_rfc3339(),
            self.packet_id,
            self.classification,
            self.score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(Classification::from_label("Anomaly"), Classification::Anomaly);
        assert_eq!(Classification::from_label("Normal"), Classification::Normal);
        // Unknown labels never alert
        assert_eq!(Classification::from_label("suspicious"), Classification::Normal);
        assert_eq!(Classification::from_label(""), Classification::Normal);
    }

    #[test]
    fn test_csv_row() {
        let outcome = ScoringOutcome {
            packet_id: "pkt_7".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            classification: Classification::Anomaly,
            score: -5.0,
        };
        assert_eq!(outcome.csv_row(), "2024-01-02T03:04:05+00:00,pkt_7,Anomaly,-5");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ScoringOutcome {
            packet_id: "pkt_1".to_string(),
            timestamp: Utc::now(),
            classification: Classification::Normal,
            score: 1.0,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let back: ScoringOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.packet_id, outcome.packet_id);
        assert_eq!(back.classification, outcome.classification);
    }
}
