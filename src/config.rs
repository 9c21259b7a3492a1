//! Configuration management for the sentinel pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the consumer group starts reading from the transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StartFrom {
    /// Only messages published after the consumer joins
    #[default]
    Latest,
    /// Replay from the beginning of the stream (requires a persistent stream)
    Earliest,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub transport: TransportConfig,
    pub counter: CounterConfig,
    pub scoring: ScoringConfig,
    pub sink: SinkConfig,
    pub mirror: MirrorConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Transport (NATS) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Broker URL
    pub broker_url: String,
    /// Subject carrying raw traffic records
    pub topic: String,
    /// Queue group name for consumer-group parallelism
    pub consumer_group: String,
    /// Offset intent when joining the group
    #[serde(default)]
    pub start_from: StartFrom,
    /// Connection attempts before startup fails
    #[serde(default = "default_startup_retries")]
    pub startup_retries: u32,
    /// Delay between connection attempts in seconds
    #[serde(default = "default_startup_retry_delay")]
    pub startup_retry_delay_secs: u64,
}

fn default_startup_retries() -> u32 {
    10
}

fn default_startup_retry_delay() -> u64 {
    5
}

/// Windowed rate counter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Time-to-live of a window key in seconds
    #[serde(default = "default_window_ttl")]
    pub window_ttl_secs: i64,
}

fn default_window_ttl() -> i64 {
    2
}

/// Scoring oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Scoring endpoint URL
    pub url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_scoring_timeout")]
    pub timeout_ms: u64,
}

fn default_scoring_timeout() -> u64 {
    5000
}

/// Result sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Directory holding the append-only logs
    pub data_dir: String,
    /// Feature log filename (offline retraining data)
    #[serde(default = "default_feature_log")]
    pub feature_log: String,
    /// Prediction log filename (monitoring data)
    #[serde(default = "default_prediction_log")]
    pub prediction_log: String,
}

fn default_feature_log() -> String {
    "live_traffic.csv".to_string()
}

fn default_prediction_log() -> String {
    "predictions.csv".to_string()
}

/// Feature-store mirror configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Whether to push rows to the feature store at all
    pub enabled: bool,
    /// Push endpoint of the feature store
    pub push_url: String,
    /// Push source name the store routes rows by
    pub source_name: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of records processed concurrently
    pub workers: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file location plus environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path plus environment overrides.
    ///
    /// The file is optional; `SENTINEL__SECTION__KEY` environment variables
    /// override individual values either way.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())
            .context("Failed to build default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("SENTINEL").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig {
                broker_url: "nats://localhost:4222".to_string(),
                topic: "network-traffic".to_string(),
                consumer_group: "feature-processor".to_string(),
                start_from: StartFrom::Latest,
                startup_retries: 10,
                startup_retry_delay_secs: 5,
            },
            counter: CounterConfig {
                redis_url: "redis://localhost:6379/0".to_string(),
                window_ttl_secs: 2,
            },
            scoring: ScoringConfig {
                url: "http://localhost:3000/predict".to_string(),
                timeout_ms: 5000,
            },
            sink: SinkConfig {
                data_dir: "data".to_string(),
                feature_log: "live_traffic.csv".to_string(),
                prediction_log: "predictions.csv".to_string(),
            },
            mirror: MirrorConfig {
                enabled: true,
                push_url: "http://localhost:6566/push".to_string(),
                source_name: "packet_push_source".to_string(),
            },
            pipeline: PipelineConfig { workers: 4 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.transport.broker_url, "nats://localhost:4222");
        assert_eq!(config.transport.topic, "network-traffic");
        assert_eq!(config.transport.start_from, StartFrom::Latest);
        assert_eq!(config.counter.window_ttl_secs, 2);
        assert_eq!(config.scoring.url, "http://localhost:3000/predict");
        assert_eq!(config.scoring.timeout_ms, 5000);
        assert_eq!(config.pipeline.workers, 4);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.transport.consumer_group, "feature-processor");
        assert_eq!(config.sink.feature_log, "live_traffic.csv");
    }
}
