//! Operator status routes mounted under /api/v1

use axum::{routing::get, Router};
use crate::api::controller::system::SystemController;
use crate::app_state::AppState;

pub fn system_routes() -> Router<AppState> {
    Router::new().route("/status", get(SystemController::status))
}
