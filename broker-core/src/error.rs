use thiserror::Error;

/// Failures raised by [`crate::queue::Queue`] operations.
///
/// Kept deliberately small: the queue only ever fails one way from a
/// caller's perspective, and the HTTP layer maps it to a 404.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task not found")]
    NotFound,
}
