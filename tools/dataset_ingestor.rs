//! Dataset Ingestor
//!
//! Replays a captured NSL-KDD CSV onto the record topic, stamping each row
//! with a packet id and an ingestion timestamp. Rows are published with a
//! configurable inter-record delay and the replay repeats until interrupted.

use anyhow::{Context, Result};
use serde_json::{Map, Number, Value};
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

/// Standard NSL-KDD column names, in dataset order
const COLUMNS: &[&str] = &[
    "duration",
    "protocol_type",
    "service",
    "flag",
    "src_bytes",
    "dst_bytes",
    "land",
    "wrong_fragment",
    "urgent",
    "hot",
    "num_failed_logins",
    "logged_in",
    "num_compromised",
    "root_shell",
    "su_attempted",
    "num_root",
    "num_file_creations",
    "num_shells",
    "num_access_files",
    "num_outbound_cmds",
    "is_host_login",
    "is_guest_login",
    "count",
    "srv_count",
    "serror_rate",
    "srv_serror_rate",
    "rerror_rate",
    "srv_rerror_rate",
    "same_srv_rate",
    "diff_srv_rate",
    "srv_diff_host_rate",
    "dst_host_count",
    "dst_host_srv_count",
    "dst_host_same_srv_rate",
    "dst_host_diff_srv_rate",
    "dst_host_same_src_port_rate",
    "dst_host_srv_diff_host_rate",
    "dst_host_serror_rate",
    "dst_host_srv_serror_rate",
    "dst_host_rerror_rate",
    "dst_host_srv_rerror_rate",
    "label",
    "difficulty",
];

/// Numbers stay numbers, everything else stays a string
fn parse_field(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Build one record from a dataset row, keyed by the standard columns and
/// stamped with the replay's packet id. Blank lines yield None.
fn record_from_row(line: &str, packet_id: u64) -> Option<Map<String, Value>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut record = Map::new();
    for (name, raw) in COLUMNS.iter().zip(line.split(',')) {
        record.insert(name.to_string(), parse_field(raw.trim()));
    }
    record.insert("packet_id".to_string(), Value::String(packet_id.to_string()));
    Some(record)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dataset_ingestor=info".parse()?),
        )
        .init();

    info!("Starting Dataset Ingestor");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let broker_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let topic = args.get(2).map(|s| s.as_str()).unwrap_or("network-traffic");
    let input_file = args.get(3).map(|s| s.as_str()).unwrap_or("data/kdd_train.csv");
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(500);

    info!(
        broker_url = %broker_url,
        topic = %topic,
        input_file = %input_file,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let contents = std::fs::read_to_string(input_file)
        .with_context(|| format!("Failed to read dataset {input_file}"))?;
    let rows: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
    if rows.is_empty() {
        anyhow::bail!("Dataset {input_file} has no rows");
    }
    info!(records = rows.len(), "Dataset loaded");

    let client = async_nats::connect(broker_url)
        .await
        .with_context(|| format!("Failed to connect to broker at {broker_url}"))?;
    info!("Connected to broker");

    let mut packet_id: u64 = 0;
    let delay = Duration::from_millis(delay_ms);

    'replay: loop {
        for row in &rows {
            let Some(mut record) = record_from_row(row, packet_id) else {
                warn!(packet_id = packet_id, "Unparseable row, skipping");
                continue;
            };
            record.insert(
                "timestamp".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );

            let protocol = record
                .get("protocol_type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let label = record
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();

            let payload = serde_json::to_vec(&Value::Object(record))?;
            client.publish(topic.to_string(), payload.into()).await?;
            info!("Produced [{}]: {} | {}", packet_id, protocol, label);

            packet_id += 1;

            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Interrupted, stopping");
                    break 'replay;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        info!("Replay cycle complete, starting over");
    }

    info!(published = packet_id, "Ingestor finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = "0,tcp,http,SF,491,0,0,0,0,0,0,1,0,0,0,0,0,0,0,0,0,0,2,2,\
                       0.0,0.0,0.0,0.0,1.0,0.0,0.0,150,25,0.17,0.03,0.17,0.0,0.0,\
                       0.0,0.05,0.0,normal,20";

    #[test]
    fn test_row_maps_to_named_fields() {
        let record = record_from_row(ROW, 7).unwrap();
        assert_eq!(record.get("protocol_type"), Some(&Value::String("tcp".into())));
        assert_eq!(record.get("service"), Some(&Value::String("http".into())));
        assert_eq!(record.get("flag"), Some(&Value::String("SF".into())));
        assert_eq!(record.get("src_bytes"), Some(&Value::Number(491.into())));
        assert_eq!(record.get("srv_count"), Some(&Value::Number(2.into())));
        assert_eq!(record.get("label"), Some(&Value::String("normal".into())));
        assert_eq!(record.get("packet_id"), Some(&Value::String("7".into())));
    }

    #[test]
    fn test_fractional_fields_stay_numeric() {
        let record = record_from_row(ROW, 0).unwrap();
        let rate = record.get("same_srv_rate").and_then(Value::as_f64).unwrap();
        assert_eq!(rate, 1.0);
    }

    #[test]
    fn test_blank_row_is_skipped() {
        assert!(record_from_row("   ", 0).is_none());
    }

    #[test]
    fn test_replayed_row_deserializes_as_traffic_record() {
        let mut record = record_from_row(ROW, 3).unwrap();
        record.insert(
            "timestamp".to_string(),
            Value::String("2024-01-02T03:04:05+00:00".into()),
        );
        let payload = serde_json::to_vec(&Value::Object(record)).unwrap();

        let parsed: sentinel_pipeline::TrafficRecord =
            serde_json::from_slice(&payload).unwrap();
        assert_eq!(parsed.packet_id.as_deref(), Some("3"));
        assert_eq!(parsed.protocol_type, "tcp");
        assert_eq!(parsed.src_bytes, 491.0);
        assert_eq!(parsed.srv_count, 2.0);
    }
}
