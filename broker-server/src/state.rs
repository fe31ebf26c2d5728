//! Shared application state threaded through every handler via axum's
//! `State` extractor.

use std::sync::{Arc, Mutex};

use broker_core::{Queue, StatsCollector, Task};
use futures::future::BoxFuture;

use crate::auth::Credentials;

/// A registered callback invoked, in registration order, after a task
/// completes successfully. Errors are logged and swallowed: one bad handler
/// must not stop the others from running.
pub type ResultHandler = Arc<dyn Fn(Task) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<Queue>,
    pub stats: Arc<StatsCollector>,
    pub credentials: Arc<Credentials>,
    result_handlers: Arc<Mutex<Vec<ResultHandler>>>,
}

impl AppState {
    pub fn new(queue: Arc<Queue>, stats: Arc<StatsCollector>, credentials: Arc<Credentials>) -> Self {
        Self {
            queue,
            stats,
            credentials,
            result_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn register_result_handler(&self, handler: ResultHandler) {
        self.result_handlers.lock().unwrap().push(handler);
    }

    /// Runs every registered handler against `task` in registration order.
    /// Called after a successful `Queue::complete`; never holds the handler
    /// list lock across an `.await`.
    pub async fn run_result_handlers(&self, task: &Task) {
        let handlers = self.result_handlers.lock().unwrap().clone();
        for handler in handlers {
            if let Err(err) = handler(task.clone()).await {
                tracing::warn!(task = %task.id, error = %err, "result handler failed");
            }
        }
    }
}
