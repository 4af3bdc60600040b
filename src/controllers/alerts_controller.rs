use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AlertError,
    models::{AlertKind, NewAlert, Trigger},
    AppState,
};

/// Body of the create-alert form: the flat `(type, targetValue, initialPrice)`
/// shape, validated into a `Trigger` before it reaches the store.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertBody {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub target_value: f64,
    #[serde(default)]
    pub initial_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveBody {
    pub active: bool,
}

fn error_response(e: &AlertError) -> Response {
    let status = match e {
        AlertError::MalformedAlert(_) => StatusCode::BAD_REQUEST,
        AlertError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AlertError::FetchFailure { .. } => StatusCode::BAD_GATEWAY,
    };

    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

// The monitor's alert set is a snapshot; pick up the change for its user.
async fn refresh_monitor(state: &AppState) {
    let status = state.monitor.reload().await;
    tracing::debug!(?status, "alert monitor reloaded after alert change");
}

// GET /api/users/:user_id/alerts
pub async fn get_user_alerts(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let mut alerts = state.store.list_by_user(&user_id).await;
    alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    (StatusCode::OK, Json(json!({ "alerts": alerts }))).into_response()
}

// POST /api/users/:user_id/alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<CreateAlertBody>,
) -> Response {
    let new = Trigger::from_parts(body.kind, body.target_value, body.initial_price)
        .and_then(|trigger| NewAlert::new(user_id, &body.symbol, trigger, state.clock.now_millis()));

    let new = match new {
        Ok(n) => n,
        Err(e) => return error_response(&e),
    };

    match state.store.create(new).await {
        Ok(alert) => {
            tracing::info!(alert_id = %alert.id, symbol = %alert.symbol, "alert created");
            if alert.user_id == state.monitor.user_id() {
                refresh_monitor(&state).await;
            }
            (StatusCode::CREATED, Json(alert)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "alert creation failed");
            error_response(&e)
        }
    }
}

// DELETE /api/alerts/:id
pub async fn delete_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.delete(&id).await {
        Ok(()) => {
            refresh_monitor(&state).await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(&e),
    }
}

// POST /api/alerts/:id/active
pub async fn post_set_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetActiveBody>,
) -> Response {
    match state.store.set_active(&id, body.active).await {
        Ok(true) => {
            refresh_monitor(&state).await;
            (StatusCode::OK, Json(json!({ "id": id, "active": body.active }))).into_response()
        }
        Ok(false) => (StatusCode::NOT_FOUND, Json(json!({ "error": "alert not found" }))).into_response(),
        Err(e) => error_response(&e),
    }
}
