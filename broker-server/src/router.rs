//! Router construction for the task dispatch broker.

use axum::{
    middleware as axum_mw,
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::handlers;
use crate::state::AppState;

/// Builds the full axum router. Every `/task*` and `/lock` route sits behind
/// the auth middleware; `/health` does not.
pub fn build_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/task", post(handlers::task::submit_task).get(handlers::task::list_pending))
        .route("/task/taken", get(handlers::task::list_taken))
        .route("/task/pending", patch(handlers::task::claim_task))
        .route(
            "/task/:task_id",
            patch(handlers::task::report_task).delete(handlers::task::delete_task),
        )
        .route("/lock", get(handlers::lock::list_locks))
        .layer(axum_mw::from_fn_with_state(state.credentials.clone(), require_auth));

    let public = Router::new().route("/health", get(handlers::health::health));

    public
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
