//! Operational endpoints under `/ops/`.
//!
//! These sit outside the request pipeline: no rate limiting, no auth.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::ApplicationConfig;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub time: String,
}

impl Health {
    fn now(status: &'static str) -> Self {
        Self {
            status,
            time: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub async fn liveness() -> Json<Health> {
    Json(Health::now("alive"))
}

pub async fn readiness() -> Json<Health> {
    Json(Health::now("ready"))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

pub async fn info(State(state): State<AppState>) -> Json<ApplicationConfig> {
    Json(state.application.as_ref().clone())
}
