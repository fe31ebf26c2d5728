//! The task submission, listing, claim, report, and removal endpoints.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::{Query as RepeatableQuery, QueryRejection};
use broker_core::{CompleteRequest, Task, TaskRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Extracted with `axum_extra::extract::Query`, not the plain axum one:
/// `unique_ignore_kwarg` is repeatable (`?unique_ignore_kwarg=a&unique_ignore_kwarg=b`,
/// mirroring `request.query.getall(...)` in the reference system), and
/// axum's own `Query` — backed by `serde_urlencoded` — does not reliably
/// collect repeated keys into a `Vec` field.
#[derive(Debug, Deserialize)]
pub struct SubmitQuery {
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    wait: bool,
    #[serde(default)]
    unique_ignore_kwarg: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    offset: Option<usize>,
    limit: Option<usize>,
}

fn clamp_page(q: &PageQuery, max_offset: usize) -> (usize, usize) {
    let offset = q.offset.unwrap_or(0).min(max_offset);
    let limit = q.limit.unwrap_or(50).clamp(1, 50);
    (offset, limit)
}

/// `POST /task` — submit a task, optionally suppressing duplicates and
/// optionally blocking until it completes.
pub async fn submit_task(
    State(state): State<AppState>,
    query: Result<RepeatableQuery<SubmitQuery>, QueryRejection>,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let RepeatableQuery(query) = query?;
    let Json(req) = body?;
    let task = Task::new(req);
    let pool = task.pool.clone();
    let completed = task.completed.clone();

    let ignore_keys: HashSet<String> = query.unique_ignore_kwarg.into_iter().collect();
    let enqueued = state.queue.put(task, query.unique, &ignore_keys);

    state.stats.push_task_received(&pool);
    if !enqueued {
        state.stats.push_task_duplicate(&pool);
    }
    state.stats.set_tasks_queued(state.queue.task_count());

    if query.wait {
        let payload = completed.wait().await;
        return Ok(Json(payload).into_response());
    }

    Ok(Json(json!({"result": "success"})).into_response())
}

/// `GET /task` — paginated view of pending tasks.
pub async fn list_pending(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Json<Value> {
    let (offset, limit) = clamp_page(&query, state.queue.task_count());
    let tasks: Vec<Value> = state.queue.tasks(offset, limit).iter().map(Task::for_json).collect();
    Json(Value::Array(tasks))
}

/// `GET /task/taken` — paginated view of active tasks.
///
/// The offset clamp uses the *pending* count, not the active count — this
/// mirrors `list_taken_tasks` in the reference system, which reuses the same
/// `queue.task_count` bound for both listings.
pub async fn list_taken(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Json<Value> {
    let (offset, limit) = clamp_page(&query, state.queue.task_count());
    let tasks: Vec<Value> = state.queue.tasks_active(offset, limit).iter().map(Task::for_json).collect();
    Json(Value::Array(tasks))
}

#[derive(Debug, Deserialize)]
pub struct ClaimQuery {
    pool: Option<String>,
}

/// `PATCH /task/pending` — a worker claims the next eligible task in `pool`.
pub async fn claim_task(State(state): State<AppState>, Query(query): Query<ClaimQuery>) -> Json<Value> {
    let Some(pool) = query.pool else {
        return Json(Value::Null);
    };

    match state.queue.get(&pool) {
        Some(task) => Json(task.worker_info()),
        None => Json(Value::Null),
    }
}

/// `PATCH /task/{task_id}` — a worker reports a task's outcome.
pub async fn report_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    body: Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(data) = body?;
    let task = state.queue.complete(task_id, data)?;

    state.stats.push_task_completed(&task.pool);
    state.stats.push_task_processing(&task.pool, task.processing_duration());
    state.stats.set_tasks_queued(state.queue.task_count());

    state.run_result_handlers(&task).await;

    Ok(Json(json!({"result": "Success"})))
}

/// `DELETE /task/{task_id}` — remove a task wherever it currently lives.
pub async fn delete_task(State(state): State<AppState>, Path(task_id): Path<Uuid>) -> Result<Json<Value>, AppError> {
    state.queue.safe_remove(task_id)?;
    state.stats.set_tasks_queued(state.queue.task_count());
    Ok(Json(json!({"result": "Success"})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_query_collects_repeated_ignore_kwarg() {
        let query: SubmitQuery =
            serde_html_form::from_str("unique=true&unique_ignore_kwarg=foo&unique_ignore_kwarg=bar").unwrap();

        assert!(query.unique);
        assert_eq!(query.unique_ignore_kwarg, vec!["foo".to_string(), "bar".to_string()]);
    }
}
