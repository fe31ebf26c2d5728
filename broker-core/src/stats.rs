use std::sync::Mutex;

/// Insertion-ordered per-pool counters plus a running total. Mirrors the
/// reference system's reliance on dict insertion order for a stable
/// `stat_iter` without pulling in an external ordered-map crate.
#[derive(Default)]
struct PoolCounters {
    total: i64,
    order: Vec<String>,
    values: std::collections::HashMap<String, i64>,
}

impl PoolCounters {
    fn incr(&mut self, pool: &str, by: i64) {
        self.total += by;
        let key = pool.replace('.', "_");
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
            self.values.insert(key.clone(), 0);
        }
        *self.values.get_mut(&key).unwrap() += by;
    }

    fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.order.iter().map(move |key| (key.as_str(), self.values[key]))
    }
}

#[derive(Default)]
struct Inner {
    tasks_received: PoolCounters,
    tasks_completed: PoolCounters,
    tasks_duplicates: PoolCounters,
    task_processing: PoolCounters,
    tasks_queued: i64,
}

/// Monotonic counters and gauges keyed by pool, sampled periodically by the
/// metric pusher and updated as side effects of queue operations.
#[derive(Default)]
pub struct StatsCollector {
    inner: Mutex<Inner>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_task_received(&self, pool: &str) {
        self.inner.lock().unwrap().tasks_received.incr(pool, 1);
    }

    pub fn push_task_completed(&self, pool: &str) {
        self.inner.lock().unwrap().tasks_completed.incr(pool, 1);
    }

    pub fn push_task_duplicate(&self, pool: &str) {
        self.inner.lock().unwrap().tasks_duplicates.incr(pool, 1);
    }

    pub fn push_task_processing(&self, pool: &str, seconds: i64) {
        self.inner.lock().unwrap().task_processing.incr(pool, seconds);
    }

    pub fn set_tasks_queued(&self, count: usize) {
        self.inner.lock().unwrap().tasks_queued = count as i64;
    }

    /// `(metric path, value)` pairs in the stable order documented in
    /// `SPEC_FULL.md` §4.3: each category's total, then its per-pool entries
    /// in first-seen order, one category after another.
    pub fn stat_iter(&self) -> Vec<(String, i64)> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();

        out.push(("tasks_received.total".to_string(), inner.tasks_received.total));
        for (pool, value) in inner.tasks_received.iter() {
            out.push((format!("tasks_received.pool.{pool}"), value));
        }

        out.push(("tasks_completed.total".to_string(), inner.tasks_completed.total));
        for (pool, value) in inner.tasks_completed.iter() {
            out.push((format!("tasks_completed.pool.{pool}"), value));
        }

        out.push(("tasks_duplicates.total".to_string(), inner.tasks_duplicates.total));
        for (pool, value) in inner.tasks_duplicates.iter() {
            out.push((format!("tasks_duplicates.pool.{pool}"), value));
        }

        out.push(("task_processing.total".to_string(), inner.task_processing.total));
        for (pool, value) in inner.task_processing.iter() {
            out.push((format!("task_processing.pool.{pool}"), value));
        }

        out.push(("tasks_queued".to_string(), inner.tasks_queued));

        out
    }
}
