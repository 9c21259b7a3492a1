//! Redis-backed windowed rate counter.
//!
//! Approximates "requests from this traffic class in the last N seconds" with
//! an atomic INCR plus a TTL set on the first increment. The TTL is not
//! refreshed by later increments, so the window is anchored at the first hit
//! after the previous expiry rather than sliding continuously. That
//! approximation matches what the model was trained against.

use crate::config::CounterConfig;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, warn};

/// Per-key rate counter with a fixed time-to-live.
///
/// The backend is the only state shared between concurrent processing
/// contexts; INCR keeps increments atomic across them. When no backend is
/// reachable the counter degrades to returning 0 so the pipeline keeps
/// running without the rate signal.
#[derive(Clone)]
pub struct RateCounter {
    conn: Option<ConnectionManager>,
    window_ttl_secs: i64,
}

impl RateCounter {
    /// Connect to the configured Redis backend. A failed connection is logged
    /// and yields an offline counter, never an error.
    pub async fn connect(config: &CounterConfig) -> Self {
        let conn = match redis::Client::open(config.redis_url.as_str()) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    info!(url = %config.redis_url, "Connected to Redis for window counting");
                    Some(conn)
                }
                Err(e) => {
                    warn!(url = %config.redis_url, error = %e, "Redis unreachable, rate counting disabled");
                    None
                }
            },
            Err(e) => {
                warn!(url = %config.redis_url, error = %e, "Invalid Redis URL, rate counting disabled");
                None
            }
        };

        Self {
            conn,
            window_ttl_secs: config.window_ttl_secs,
        }
    }

    /// A counter with no backend; every increment returns 0.
    pub fn offline(window_ttl_secs: i64) -> Self {
        Self {
            conn: None,
            window_ttl_secs,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Increment `key` and return the count of increments in the current
    /// window: 1 on the first hit (or first hit after expiry), then 2, 3, …
    /// within the TTL. Returns 0 when the backend is absent or a command
    /// fails.
    pub async fn increment(&self, key: &str) -> u64 {
        let Some(conn) = &self.conn else {
            return 0;
        };
        let mut conn = conn.clone();

        let count: u64 = match conn.incr(key, 1).await {
            Ok(count) => count,
            Err(e) => {
                warn!(key = %key, error = %e, "Counter increment failed, returning 0");
                return 0;
            }
        };

        // TTL only on window open; later increments must not extend it.
        if count == 1 {
            let result: Result<(), _> = conn.expire(key, self.window_ttl_secs).await;
            if let Err(e) = result {
                warn!(key = %key, error = %e, "Failed to set window TTL");
            }
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[tokio::test]
    async fn test_offline_counter_returns_zero() {
        let counter = RateCounter::offline(2);
        assert!(!counter.is_connected());
        assert_eq!(counter.increment("count:tcp_http").await, 0);
        assert_eq!(counter.increment("count:tcp_http").await, 0);
    }

    // Needs a running Redis; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires a running Redis at redis://localhost:6379"]
    async fn test_window_counts_up_then_resets_after_ttl() {
        let counter = RateCounter::connect(&CounterConfig {
            redis_url: "redis://localhost:6379/0".to_string(),
            window_ttl_secs: 2,
        })
        .await;
        assert!(counter.is_connected());

        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let key = format!("count:test_{}_{}", std::process::id(), nonce);

        // Two increments inside the window count up
        assert_eq!(counter.increment(&key).await, 1);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.increment(&key).await, 2);

        // The second increment must not have extended the TTL: three seconds
        // after the window opened the key is gone and the count restarts
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(counter.increment(&key).await, 1);
    }
}
