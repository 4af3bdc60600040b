use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::monitor_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/monitor", get(monitor_controller::get_monitor_status))
        .route("/api/monitor/reload", post(monitor_controller::post_reload))
}
