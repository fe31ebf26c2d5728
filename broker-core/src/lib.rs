//! broker-core — the in-memory scheduling queue, task entity, and stats
//! collector for the task dispatch broker.
//!
//! No I/O lives here: everything is synchronous state manipulation, safe to
//! share behind an `Arc` and call from any number of concurrent HTTP
//! handlers.

pub mod error;
pub mod queue;
pub mod stats;
pub mod task;

pub use error::QueueError;
pub use queue::Queue;
pub use stats::StatsCollector;
pub use task::{CompleteRequest, Completion, CompletionPayload, Task, TaskRequest};
