//! `GET /lock` — list every currently held lock and its owning task.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn list_locks(State(state): State<AppState>) -> Json<Value> {
    let entries: Vec<Value> = state
        .queue
        .iter_locks()
        .into_iter()
        .map(|(id, task, taken)| {
            json!({
                "id": id,
                "task": task.for_json(),
                "taken": taken.to_rfc3339(),
            })
        })
        .collect();

    Json(Value::Array(entries))
}
