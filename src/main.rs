//! Sentinel Pipeline - Main Entry Point
//!
//! Consumes traffic records from NATS, derives features with a live windowed
//! rate count, scores them against the external anomaly model, and appends
//! results to the durable logs. Supports parallel record processing with
//! graceful shutdown.

use anyhow::Result;
use futures::StreamExt;
use sentinel_pipeline::{
    config::AppConfig,
    consumer::{self, RecordConsumer},
    counter::RateCounter,
    feature_extractor::FeatureExtractor,
    metrics::{MetricsReporter, PipelineMetrics},
    processor::StreamProcessor,
    scoring::ScoringClient,
    sink::{FeatureStoreMirror, ResultSink},
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; the log level comes from it
    let config = AppConfig::load()?;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("sentinel_pipeline={}", config.logging.level).parse()?);
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);
    if config.logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Sentinel Pipeline");
    info!(
        broker = %config.transport.broker_url,
        topic = %config.transport.topic,
        group = %config.transport.consumer_group,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Initialize components
    let extractor = FeatureExtractor::new();
    info!(features = extractor.feature_count(), "Feature extractor initialized");

    let counter = RateCounter::connect(&config.counter).await;
    if !counter.is_connected() {
        info!("Running without rate counting; live count pinned to 0");
    }

    let scoring = ScoringClient::new(&config.scoring)?;
    info!(url = %scoring.url(), timeout_ms = config.scoring.timeout_ms, "Scoring client ready");

    let sink = Arc::new(ResultSink::new(&config.sink)?);
    let mirror = FeatureStoreMirror::new(&config.mirror)?;

    // Connect to the broker; this is the only fatal failure path
    let client = consumer::connect_with_retry(&config.transport).await?;
    let consumer = RecordConsumer::new(client, &config.transport);

    let processor = Arc::new(StreamProcessor::new(
        extractor,
        counter,
        scoring,
        sink,
        mirror,
        metrics.clone(),
    ));

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    let num_workers = config.pipeline.workers;
    info!(workers = num_workers, "Starting record processing loop");

    // Semaphore to limit concurrent record tasks
    let semaphore = Arc::new(tokio::sync::Semaphore::new(num_workers));
    let mut subscription = consumer.subscribe().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, draining in-flight records");
                break;
            }
            message = subscription.next() => {
                let Some(message) = message else {
                    info!("Subscription closed by the broker");
                    break;
                };

                let permit = semaphore.clone().acquire_owned().await?;
                let processor = processor.clone();

                tokio::spawn(async move {
                    if let Err(e) = processor.process_payload(&message.payload).await {
                        error!(error = %e, "Failed to process record");
                    }
                    drop(permit);
                });
            }
        }
    }

    // Let in-flight records finish their full per-record pipeline
    let _ = semaphore.acquire_many(num_workers as u32).await?;

    info!("Pipeline shutting down");
    metrics.print_summary();

    Ok(())
}
