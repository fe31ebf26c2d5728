use std::collections::BTreeSet;
use std::sync::Mutex as StdMutex;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Notify;
use uuid::Uuid;

/// Wire shape accepted by `POST /task`. Fields not recognized here are
/// silently dropped by serde during deserialization.
#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub locks: BTreeSet<String>,
    pub pool: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Outcome fields a worker reports via `PATCH /task/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub result: Option<Value>,
    pub status: Option<String>,
    pub traceback: Option<String>,
}

/// The payload carried by a task's completion signal: `{status, result}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionPayload {
    pub status: Option<String>,
    pub result: Option<Value>,
}

/// One-shot, level-triggered, multi-awaiter completion signal.
///
/// Uses the standard `Notify` race-avoidance idiom: the payload slot is
/// checked both before and after constructing the `notified()` future, so a
/// `fire()` that happens between the two checks is never missed.
#[derive(Debug, Default)]
pub struct Completion {
    notify: Notify,
    payload: StdMutex<Option<CompletionPayload>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal with `payload`. A second call is a no-op: the first
    /// recorded payload wins and waiters are not notified again.
    pub fn fire(&self, payload: CompletionPayload) {
        let mut guard = self.payload.lock().unwrap();
        if guard.is_some() {
            return;
        }
        *guard = Some(payload);
        drop(guard);
        self.notify.notify_waiters();
    }

    /// Waits for the signal to fire and returns its payload.
    pub async fn wait(&self) -> CompletionPayload {
        loop {
            if let Some(payload) = self.payload.lock().unwrap().clone() {
                return payload;
            }
            let notified = self.notify.notified();
            if let Some(payload) = self.payload.lock().unwrap().clone() {
                return payload;
            }
            notified.await;
        }
    }
}

/// A unit of dispatchable work.
///
/// Cloning a `Task` is shallow except for `completed`, which is `Arc`-shared:
/// a submitter's clone observes the exact same completion signal the queue
/// fires when a worker reports an outcome.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub locks: BTreeSet<String>,
    pub pool: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,

    pub status: String,
    pub created: DateTime<Utc>,
    pub taken: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,

    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub result: Option<Value>,
    pub traceback: Option<String>,

    pub completed: Arc<Completion>,
}

impl Task {
    pub fn new(req: TaskRequest) -> Self {
        Self {
            id: req.id.unwrap_or_else(Uuid::new_v4),
            name: req.name,
            locks: req.locks,
            pool: req.pool,
            args: req.args,
            kwargs: req.kwargs,
            status: req.status.unwrap_or_else(|| "pending".to_string()),
            created: Utc::now(),
            taken: None,
            finished: None,
            stdout: None,
            stderr: None,
            result: None,
            traceback: None,
            completed: Arc::new(Completion::new()),
        }
    }

    /// Applies a worker's reported outcome. Idempotent: a second call after
    /// `finished` is already set leaves all outcome fields untouched and does
    /// not re-fire the completion signal.
    pub fn complete(&mut self, data: CompleteRequest) {
        if self.finished.is_some() {
            return;
        }

        if data.stdout.is_some() {
            self.stdout = data.stdout;
        }
        if data.stderr.is_some() {
            self.stderr = data.stderr;
        }
        if data.result.is_some() {
            self.result = data.result.clone();
        }
        if let Some(status) = data.status.clone() {
            self.status = status;
        }
        if data.traceback.is_some() {
            self.traceback = data.traceback;
        }

        self.finished = Some(Utc::now());

        self.completed.fire(CompletionPayload {
            status: data.status,
            result: data.result,
        });
    }

    /// Minimum a worker needs to execute the task.
    pub fn worker_info(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "args": self.args,
            "kwargs": self.kwargs,
        })
    }

    /// The serializable view used in task listings: identity, classification,
    /// payload, and lifecycle timestamps, but not the completion outcome.
    pub fn for_json(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "locks": self.locks,
            "pool": self.pool,
            "args": self.args,
            "kwargs": self.kwargs,
            "status": self.status,
            "created": self.created,
            "taken": self.taken,
        })
    }

    /// All fields, including the completion outcome.
    pub fn full_info(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "locks": self.locks,
            "pool": self.pool,
            "args": self.args,
            "kwargs": self.kwargs,
            "status": self.status,
            "created": self.created,
            "taken": self.taken,
            "finished": self.finished,
            "stdout": self.stdout,
            "stderr": self.stderr,
            "result": self.result,
            "traceback": self.traceback,
        })
    }

    /// Processing duration in whole seconds; zero until `finished` is set.
    pub fn processing_duration(&self) -> i64 {
        match self.finished {
            Some(finished) => (finished - self.created).num_seconds().max(0),
            None => 0,
        }
    }
}

/// Structural equivalence used by `Queue::put`'s uniqueness check: same
/// `name`, same `locks` set, same `args` sequence, and equal `kwargs` after
/// dropping any key in `ignore_keys` from both sides.
pub fn equivalent(a: &Task, b: &Task, ignore_keys: &std::collections::HashSet<String>) -> bool {
    if a.name != b.name || a.locks != b.locks || a.args != b.args {
        return false;
    }

    let a_keys: BTreeSet<&String> = a.kwargs.keys().filter(|k| !ignore_keys.contains(*k)).collect();
    let b_keys: BTreeSet<&String> = b.kwargs.keys().filter(|k| !ignore_keys.contains(*k)).collect();
    if a_keys != b_keys {
        return false;
    }

    a_keys.into_iter().all(|k| a.kwargs.get(k) == b.kwargs.get(k))
}
