//! The Graphite metric pusher: samples the stats collector on a fixed
//! cadence and ships framed pickle payloads over a fresh TCP connection per
//! send, tolerating a flaky or absent collector without ever bothering a
//! client.

use std::sync::Arc;
use std::time::Duration;

use broker_core::StatsCollector;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::pickle::{encode_metrics, frame};

const CHANNEL_CAPACITY: usize = 100;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct GraphiteConfig {
    pub host: String,
    pub port: u16,
    pub stats_root: String,
    pub frequency: Duration,
}

fn prefix_key(root: &str, key: &str) -> String {
    if root.is_empty() {
        key.to_string()
    } else {
        format!("{root}.{key}")
    }
}

/// Spawns the sample and send loops as detached tasks. Returns immediately;
/// both loops run for the process lifetime.
pub fn spawn(stats: Arc<StatsCollector>, config: GraphiteConfig) {
    let (tx, rx) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);

    tokio::spawn(sample_loop(stats, config.clone(), tx));
    tokio::spawn(send_loop(config, rx));
}

async fn sample_loop(stats: Arc<StatsCollector>, config: GraphiteConfig, tx: mpsc::Sender<Vec<u8>>) {
    let mut ticker = tokio::time::interval(config.frequency);
    loop {
        ticker.tick().await;

        let timestamp = chrono::Utc::now().timestamp();
        let metrics: Vec<(String, i64, i64)> = stats
            .stat_iter()
            .into_iter()
            .map(|(name, value)| (prefix_key(&config.stats_root, &name), timestamp, value))
            .collect();

        let payload = frame(&encode_metrics(&metrics));

        if tx.try_send(payload).is_err() {
            tracing::debug!("graphite send queue full or closed, dropping sample");
        }
    }
}

async fn send_loop(config: GraphiteConfig, mut rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(payload) = rx.recv().await {
        if let Err(err) = send_once(&config, &payload).await {
            tracing::debug!(error = %err, "graphite push failed, dropping frame");
        }
    }
}

async fn send_once(config: &GraphiteConfig, payload: &[u8]) -> anyhow::Result<()> {
    let addr = (config.host.as_str(), config.port);

    let mut stream = None;
    for _ in 0..CONNECT_ATTEMPTS {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(s)) => {
                stream = Some(s);
                break;
            }
            Ok(Err(_)) => return Ok(()), // connection refused: give up on this frame
            Err(_) => continue,          // timed out: retry
        }
    }

    let Some(mut stream) = stream else {
        return Ok(());
    };

    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}
