//! broker-server — the HTTP surface, auth middleware, configuration, and
//! Graphite metrics side channel wrapping `broker-core`'s queue.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod router;
pub mod state;

pub use config::Config;
pub use state::AppState;
