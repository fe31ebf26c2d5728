use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::QueueError;
use crate::task::{equivalent, CompleteRequest, Task};

struct LockEntry {
    owner: Uuid,
    acquired_at: DateTime<Utc>,
}

struct Inner {
    pending: Vec<Task>,
    active: HashMap<Uuid, Task>,
    locks: HashMap<String, LockEntry>,
}

/// The in-memory scheduling queue: pending FIFO, active map, and the
/// multi-resource lock table tying the two together.
///
/// All mutation is serialized behind a single `std::sync::Mutex`, held only
/// across the synchronous body of each operation — never across an `.await`.
/// Critical sections are small (a scan plus a few map updates), so contention
/// under request concurrency is not a concern.
pub struct Queue {
    inner: Mutex<Inner>,
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: Vec::new(),
                active: HashMap::new(),
                locks: HashMap::new(),
            }),
        }
    }

    /// Enqueues `task` unless `unique` is set and an equivalent task (per
    /// [`equivalent`], parameterized by `ignore_keys`) is already pending.
    /// Returns whether the task was actually enqueued.
    pub fn put(&self, task: Task, unique: bool, ignore_keys: &HashSet<String>) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if unique && inner.pending.iter().any(|existing| equivalent(existing, &task, ignore_keys)) {
            tracing::debug!(task = %task.id, pool = %task.pool, "suppressed duplicate task");
            return false;
        }

        tracing::debug!(task = %task.id, pool = %task.pool, "queued task");
        inner.pending.push(task);
        true
    }

    /// First-fit scan: returns the earliest pending task in `pool` whose
    /// locks are disjoint from every currently-held lock, dispatching it into
    /// `active` and acquiring its locks. A blocked task is skipped, not
    /// removed — the scan continues to find a later, unblocked task.
    pub fn get(&self, pool: &str) -> Option<Task> {
        let mut inner = self.inner.lock().unwrap();

        let index = inner.pending.iter().position(|task| {
            task.pool == pool && task.locks.iter().all(|lock| !inner.locks.contains_key(lock))
        })?;

        let mut task = inner.pending.remove(index);
        let taken_at = Utc::now();
        task.taken = Some(taken_at);

        for lock in &task.locks {
            inner.locks.insert(
                lock.clone(),
                LockEntry {
                    owner: task.id,
                    acquired_at: taken_at,
                },
            );
        }

        tracing::info!(task = %task.id, pool = %pool, "dispatched task");
        inner.active.insert(task.id, task.clone());
        Some(task)
    }

    /// Applies a worker's reported outcome to an active task, releases its
    /// locks, and returns the completed task.
    pub fn complete(&self, task_id: Uuid, data: CompleteRequest) -> Result<Task, QueueError> {
        let mut inner = self.inner.lock().unwrap();

        let mut task = inner.active.remove(&task_id).ok_or(QueueError::NotFound)?;
        task.complete(data);

        for lock in &task.locks {
            inner.locks.remove(lock);
        }

        tracing::info!(task = %task.id, pool = %task.pool, status = %task.status, "completed task");
        Ok(task)
    }

    /// Removes a task wherever it currently lives. If active, its locks are
    /// released but the completion signal is NOT fired — awaiters of a
    /// removed task's completion are left blocked until their client times
    /// out. This mirrors the reference system's behavior exactly.
    pub fn safe_remove(&self, task_id: Uuid) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(task) = inner.active.remove(&task_id) {
            for lock in &task.locks {
                inner.locks.remove(lock);
            }
            tracing::info!(task = %task_id, "removed active task");
            return Ok(());
        }

        if let Some(index) = inner.pending.iter().position(|t| t.id == task_id) {
            inner.pending.remove(index);
            tracing::info!(task = %task_id, "removed pending task");
            return Ok(());
        }

        Err(QueueError::NotFound)
    }

    pub fn task_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Snapshot of pending tasks in FIFO order, `[offset, offset+limit)`.
    pub fn tasks(&self, offset: usize, limit: usize) -> Vec<Task> {
        let inner = self.inner.lock().unwrap();
        inner.pending.iter().skip(offset).take(limit).cloned().collect()
    }

    /// Snapshot of active tasks, in an unspecified but stable-for-the-call
    /// order, `[offset, offset+limit)`.
    pub fn tasks_active(&self, offset: usize, limit: usize) -> Vec<Task> {
        let inner = self.inner.lock().unwrap();
        let mut tasks: Vec<&Task> = inner.active.values().collect();
        tasks.sort_by_key(|t| t.taken);
        tasks.into_iter().skip(offset).take(limit).cloned().collect()
    }

    pub fn tasks_pending(&self) -> Vec<Uuid> {
        self.inner.lock().unwrap().pending.iter().map(|t| t.id).collect()
    }

    pub fn tasks_active_ids(&self) -> Vec<Uuid> {
        self.inner.lock().unwrap().active.keys().copied().collect()
    }

    pub fn locks(&self) -> HashSet<String> {
        self.inner.lock().unwrap().locks.keys().cloned().collect()
    }

    /// `(lock key, owning task, acquired-at)` for every held lock.
    pub fn iter_locks(&self) -> Vec<(String, Task, DateTime<Utc>)> {
        let inner = self.inner.lock().unwrap();
        inner
            .locks
            .iter()
            .filter_map(|(key, entry)| {
                inner
                    .active
                    .get(&entry.owner)
                    .map(|task| (key.clone(), task.clone(), entry.acquired_at))
            })
            .collect()
    }
}
