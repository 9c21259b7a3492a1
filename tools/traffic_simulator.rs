//! Traffic Simulator
//!
//! Synthesizes network traffic records across weighted behavior classes
//! (normal, port scan, DoS, probe, …) and publishes them to the record topic.
//! Normal traffic is paced by a real external API call whose latency and
//! response size drive the duration and byte counts.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{info, warn};

const TIMING_API_URL: &str = "https://randomuser.me/api/";
const SERVICES: &[&str] = &["http", "ftp", "smtp", "ssh", "dns", "telnet", "pop3", "imap"];

/// Behavior classes and their draw weights (sum to 1.0)
const BEHAVIOR_WEIGHTS: &[(Behavior, f64)] = &[
    (Behavior::Normal, 0.85),
    (Behavior::PortScan, 0.05),
    (Behavior::Dos, 0.03),
    (Behavior::Probe, 0.04),
    (Behavior::RemoteToLocal, 0.02),
    (Behavior::UserToRoot, 0.01),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Normal,
    PortScan,
    Dos,
    Probe,
    RemoteToLocal,
    UserToRoot,
}

impl Behavior {
    fn name(&self) -> &'static str {
        match self {
            Behavior::Normal => "normal",
            Behavior::PortScan => "port_scan",
            Behavior::Dos => "dos",
            Behavior::Probe => "probe",
            Behavior::RemoteToLocal => "r2l",
            Behavior::UserToRoot => "u2r",
        }
    }
}

/// Record structure matching the pipeline's expected shape, plus dashboard
/// metadata fields the consumer ignores
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimulatedRecord {
    timestamp: String,
    packet_id: String,
    behavior_type: String,

    src_bytes: u64,
    dst_bytes: u64,
    duration: f64,
    protocol_type: String,
    service: String,
    flag: String,

    src_ip: String,
    dst_ip: String,
    src_port: u16,
    dst_port: u16,

    count: u64,
    srv_count: u64,
}

/// Duration/byte figures observed from the live timing source
struct LiveTiming {
    duration: f64,
    bytes_sent: u64,
    bytes_received: u64,
}

/// Generator producing one record per weighted behavior draw
struct PacketSimulator {
    rng: rand::rngs::ThreadRng,
    packet_counter: u64,
}

impl PacketSimulator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            packet_counter: 0,
        }
    }

    fn generate_ip(&mut self, is_internal: bool) -> String {
        if is_internal {
            let subnet = ["192.168", "10.0", "172.16"][self.rng.gen_range(0..3)];
            format!(
                "{}.{}.{}",
                subnet,
                self.rng.gen_range(0..=255),
                self.rng.gen_range(1..255)
            )
        } else {
            format!(
                "{}.{}.{}.{}",
                self.rng.gen_range(1..=223),
                self.rng.gen_range(0..=255),
                self.rng.gen_range(0..=255),
                self.rng.gen_range(1..255)
            )
        }
    }

    /// Weighted draw over the behavior classes
    fn select_behavior(&mut self) -> Behavior {
        let draw: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        for (behavior, weight) in BEHAVIOR_WEIGHTS {
            cumulative += weight;
            if draw <= cumulative {
                return *behavior;
            }
        }
        Behavior::Normal
    }

    /// Generate one record for a behavior class. Each class has a
    /// deterministic rule for bytes, duration and connection flag.
    fn generate(&mut self, behavior: Behavior, timing: Option<&LiveTiming>) -> SimulatedRecord {
        self.packet_counter += 1;

        // Defaults for normal traffic
        let mut src_ip = self.generate_ip(true);
        let mut dst_ip = self.generate_ip(false);
        let src_port = self.rng.gen_range(1024..=65535);
        let mut dst_port: u16 = [80, 443, 22, 21, 25, 53][self.rng.gen_range(0..6)];
        let mut service = if dst_port == 80 || dst_port == 443 {
            "http".to_string()
        } else {
            SERVICES[self.rng.gen_range(0..SERVICES.len())].to_string()
        };
        let mut flag = "SF";

        let (duration, src_bytes, dst_bytes) = match behavior {
            Behavior::Normal => match timing {
                Some(t) => (t.duration, t.bytes_sent, t.bytes_received),
                None => (
                    0.1,
                    self.rng.gen_range(200..500),
                    self.rng.gen_range(200..500),
                ),
            },
            Behavior::PortScan => {
                // Attacker outside, target inside, no reply seen
                src_ip = self.generate_ip(false);
                dst_ip = self.generate_ip(true);
                dst_port = self.rng.gen_range(1..=1024);
                service = SERVICES[self.rng.gen_range(0..SERVICES.len())].to_string();
                flag = "S0";
                (0.0, 0, 0)
            }
            Behavior::Dos => {
                src_ip = self.generate_ip(false);
                dst_ip = self.generate_ip(true);
                dst_port = 80;
                service = "http".to_string();
                flag = "S0";
                (0.001, self.rng.gen_range(5000..50000), 0)
            }
            Behavior::Probe => {
                flag = "REJ";
                (
                    self.rng.gen_range(0.001..0.1),
                    self.rng.gen_range(40..200),
                    0,
                )
            }
            Behavior::RemoteToLocal | Behavior::UserToRoot => (
                0.1,
                self.rng.gen_range(200..500),
                self.rng.gen_range(200..500),
            ),
        };

        SimulatedRecord {
            timestamp: Utc::now().to_rfc3339(),
            packet_id: self.packet_counter.to_string(),
            behavior_type: behavior.name().to_string(),
            src_bytes,
            dst_bytes,
            duration,
            protocol_type: "tcp".to_string(),
            service,
            flag: flag.to_string(),
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            count: 0,
            srv_count: 0,
        }
    }
}

/// Fetch real API traffic to drive the simulation clock. None on failure;
/// the caller falls back to synthetic timing.
async fn fetch_live_timing(client: &reqwest::Client) -> Option<LiveTiming> {
    let start = Instant::now();
    match client.get(TIMING_API_URL).send().await {
        Ok(response) if response.status().is_success() => {
            let latency = start.elapsed().as_secs_f64();
            let body_len = response.bytes().await.map(|b| b.len() as u64).ok()?;
            Some(LiveTiming {
                duration: (latency * 10000.0).round() / 10000.0,
                bytes_sent: body_len + rand::thread_rng().gen_range(100..500),
                bytes_received: body_len,
            })
        }
        Ok(response) => {
            warn!(status = %response.status(), "Timing source returned non-success");
            None
        }
        Err(e) => {
            warn!(error = %e, "Timing source fetch failed");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("traffic_simulator=info".parse()?),
        )
        .init();

    info!("Starting Traffic Simulator");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let broker_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let topic = args.get(2).map(|s| s.as_str()).unwrap_or("network-traffic");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0); // 0 = run until interrupted

    info!(
        broker_url = %broker_url,
        topic = %topic,
        count = count,
        "Configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    // Connect to the broker
    let client = match async_nats::connect(broker_url).await {
        Ok(c) => {
            info!("Connected to broker");
            Some(c)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to broker. Running in dry-run mode.");
            None
        }
    };

    let mut simulator = PacketSimulator::new();
    let mut published: u64 = 0;
    let mut by_behavior: std::collections::HashMap<&'static str, u64> = Default::default();

    loop {
        if count > 0 && published >= count {
            break;
        }

        let behavior = simulator.select_behavior();
        let timing = if behavior == Behavior::Normal {
            fetch_live_timing(&http).await
        } else {
            None
        };
        let record = simulator.generate(behavior, timing.as_ref());
        *by_behavior.entry(behavior.name()).or_insert(0) += 1;

        match &client {
            Some(client) => {
                let payload = serde_json::to_vec(&record)?;
                client.publish(topic.to_string(), payload.into()).await?;
                info!(
                    "{} | {} -> {} | Bytes: {}",
                    record.behavior_type.to_uppercase(),
                    record.src_ip,
                    record.dst_ip,
                    record.src_bytes
                );
            }
            None => {
                info!("DRY-RUN {}", serde_json::to_string(&record)?);
            }
        }

        published += 1;
        if published % 50 == 0 {
            info!(published = published, breakdown = ?by_behavior, "Progress");
        }

        // Randomized inter-arrival delay, cancellable at any point
        let delay = Duration::from_millis(rand::thread_rng().gen_range(100..800));
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    info!(published = published, breakdown = ?by_behavior, "Simulator finished");
    Ok(())
}
