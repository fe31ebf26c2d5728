//! broker — standalone entry point for the task dispatch broker.
//!
//! Reads config from CLI flags (see `broker_server::config::Config`), with
//! environment-variable fallback for the two Graphite settings.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use broker_core::{Queue, StatsCollector};
use broker_server::config::Config;
use broker_server::router::build_router;
use broker_server::state::AppState;
use broker_server::metrics;
use clap::Parser;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.loglevel.clone().into()),
        )
        .init();

    let credentials = config.build_credentials().unwrap_or_else(|err| {
        tracing::error!(error = %err, "invalid auth configuration");
        std::process::exit(1);
    });

    let queue = Arc::new(Queue::new());
    let stats = Arc::new(StatsCollector::new());
    let state = AppState::new(queue, stats.clone(), Arc::new(credentials));

    if let Some((host, port)) = config.graphite_addr() {
        tracing::info!(host = %host, port, "starting graphite metric pusher");
        metrics::spawn(
            stats,
            metrics::GraphiteConfig {
                host,
                port,
                stats_root: config.graphite_stats_root.clone(),
                frequency: Duration::from_secs(config.graphite_freq),
            },
        );
    }

    let app = build_router(state);

    let addr = SocketAddr::from((config.host, config.port));
    let listener = TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {addr}: {e}"));
    tracing::info!("broker listening on {addr}");

    axum::serve(listener, app).await.expect("server error");
}
