use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

// GET /api/monitor
pub async fn get_monitor_status(State(state): State<AppState>) -> Response {
    let status = state.monitor.state().await;

    (
        StatusCode::OK,
        Json(json!({ "userId": state.monitor.user_id(), "state": status })),
    )
        .into_response()
}

// POST /api/monitor/reload
pub async fn post_reload(State(state): State<AppState>) -> Response {
    let status = state.monitor.reload().await;
    tracing::info!(user_id = state.monitor.user_id(), ?status, "alert monitor reloaded");

    (
        StatusCode::OK,
        Json(json!({ "userId": state.monitor.user_id(), "state": status })),
    )
        .into_response()
}
