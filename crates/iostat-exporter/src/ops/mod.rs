//! Operational HTTP endpoints.
//!
//! - `/metrics` (and `/`) : Prometheus text format
//! - `/healthz`           : liveness
//! - `/readyz`            : readiness (503 once termination was requested)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

pub const CONTENT_TYPE_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_terminating() {
        (StatusCode::SERVICE_UNAVAILABLE, "terminating")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.render_metrics();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)],
        body,
    )
        .into_response()
}
