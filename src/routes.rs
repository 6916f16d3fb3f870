use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use crate::api::controller::system::SystemController;
use crate::app_state::AppState;

/// Build the main application router
pub fn app_router() -> Router<AppState> {
    Router::new()
        // Probes
        .route("/healthz", get(SystemController::healthz))
        .route("/readyz", get(SystemController::readyz))
        // API v1
        .nest("/api/v1", crate::api::routes::system_routes::system_routes())
        // Fallback handler for 404
        .fallback(handler_404)
}

// Handler for 404 Not Found
async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
