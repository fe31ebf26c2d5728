//! Startup configuration: CLI flags with environment-variable fallback for
//! the Graphite settings, mirroring the reference system's `argparse` +
//! `os.environ.get` shape.

use std::net::IpAddr;

use clap::Parser;

use crate::auth::{ConfigError, Credentials};

#[derive(Debug, Parser)]
#[command(name = "broker", about = "Centralized task dispatch broker")]
pub struct Config {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Repeatable `user:pass` basic-auth credential.
    #[arg(long = "auth-basic")]
    pub auth_basic: Vec<String>,

    /// Repeatable bearer-token credential.
    #[arg(long = "auth-bearer")]
    pub auth_bearer: Vec<String>,

    #[arg(long, default_value = "info")]
    pub loglevel: String,

    #[arg(long, env = "QUEUE_GRAPHITE")]
    pub graphite: Option<String>,

    #[arg(long, default_value = "queue", env = "QUEUE_GRAPHITE_ROOT")]
    pub graphite_stats_root: String,

    #[arg(long, default_value_t = 10)]
    pub graphite_freq: u64,
}

impl Config {
    pub fn build_credentials(&self) -> Result<Credentials, ConfigError> {
        let mut credentials = Credentials::new();
        credentials.add_basic(&self.auth_basic)?;
        credentials.add_bearer(&self.auth_bearer);
        Ok(credentials)
    }

    /// Parses `--graphite host:port`, if present.
    pub fn graphite_addr(&self) -> Option<(String, u16)> {
        let raw = self.graphite.as_ref()?;
        let (host, port) = raw.rsplit_once(':')?;
        let port: u16 = port.parse().ok()?;
        Some((host.to_string(), port))
    }
}
