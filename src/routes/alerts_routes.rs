use axum::{Router, routing::{delete, get, post}};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/users/:user_id/alerts",
            get(alerts_controller::get_user_alerts).post(alerts_controller::post_create_alert),
        )
        .route("/api/alerts/:id", delete(alerts_controller::delete_alert))
        .route("/api/alerts/:id/active", post(alerts_controller::post_set_active))
}
