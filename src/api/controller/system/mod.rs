//! System controller: health probes and controller status

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::api::dto::system_dto::{ProbeResponse, StatusResponse};
use crate::api::dto::ApiResponse;
use crate::app_state::AppState;

pub struct SystemController;

impl SystemController {
    pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
        if state.shutdown.is_cancelled() {
            return probe(StatusCode::SERVICE_UNAVAILABLE, "stopping", Vec::new());
        }
        probe(StatusCode::OK, "ok", Vec::new())
    }

    pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
        let snapshot = state.status.snapshot().await;
        if snapshot.is_ready() {
            return probe(StatusCode::OK, "ready", Vec::new());
        }

        let degraded = snapshot
            .controllers
            .values()
            .filter(|c| c.degraded)
            .map(|c| c.controller.clone())
            .collect();
        probe(StatusCode::SERVICE_UNAVAILABLE, "not ready", degraded)
    }

    pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
        let snapshot = state.status.snapshot().await;
        Json(ApiResponse::ok(StatusResponse {
            topology: state.topology,
            ready: snapshot.is_ready(),
            stopped: snapshot.stopped,
            controllers: snapshot.controllers.values().cloned().collect(),
        }))
    }
}

fn probe(code: StatusCode, status: &'static str, degraded: Vec<String>) -> (StatusCode, Json<ProbeResponse>) {
    (code, Json(ProbeResponse { status, degraded }))
}
