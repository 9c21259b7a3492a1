//! NATS consumer for incoming traffic records

use crate::config::{StartFrom, TransportConfig};
use anyhow::{bail, Result};
use async_nats::{Client, Subscriber};
use std::time::Duration;
use tracing::{info, warn};

/// Connect to the broker with bounded retries. Exhausting the retries is a
/// fatal startup error; it is the only condition allowed to stop the process.
pub async fn connect_with_retry(config: &TransportConfig) -> Result<Client> {
    let delay = Duration::from_secs(config.startup_retry_delay_secs);

    for attempt in 1..=config.startup_retries {
        match async_nats::connect(&config.broker_url).await {
            Ok(client) => {
                info!(url = %config.broker_url, "Connected to broker");
                return Ok(client);
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    retries = config.startup_retries,
                    error = %e,
                    "Waiting for broker"
                );
                if attempt < config.startup_retries {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    bail!(
        "Could not connect to broker at {} after {} attempts",
        config.broker_url,
        config.startup_retries
    )
}

/// Consumer for receiving traffic records over a queue group
pub struct RecordConsumer {
    client: Client,
    topic: String,
    group: String,
}

impl RecordConsumer {
    pub fn new(client: Client, config: &TransportConfig) -> Self {
        if config.start_from == StartFrom::Earliest {
            // Core subjects deliver live messages only; replay needs a
            // persistent stream provided by the deployment.
            warn!(topic = %config.topic, "start_from = earliest requested but transport delivers from latest");
        }

        Self {
            client,
            topic: config.topic.clone(),
            group: config.consumer_group.clone(),
        }
    }

    /// Join the queue group on the record topic. The broker load-balances
    /// messages across group members; ordering within a subject partition is
    /// the transport's concern.
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .queue_subscribe(self.topic.clone(), self.group.clone())
            .await?;
        info!(topic = %self.topic, group = %self.group, "Subscribed to record topic");
        Ok(subscriber)
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
