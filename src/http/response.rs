//! Response handling.
//!
//! # Responsibilities
//! - Render pipeline failures as the JSON error envelope
//! - Carry the backend response back to the client unchanged
//!
//! # Design Decisions
//! - `error` is the canonical reason phrase of the status, `message` is
//!   fixed human text; internal detail goes to the log only

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ProxyError;

/// Body of every proxy-generated error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorEnvelope::new(status, self.public_message());
        (status, Json(body)).into_response()
    }
}
