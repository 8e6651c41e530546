//! Error taxonomy for the request pipeline and for startup.
//!
//! Every pipeline stage fails closed by returning a [`ProxyError`]; the
//! orchestrator turns it into the JSON error envelope (see `http::response`).

use axum::http::StatusCode;

use crate::auth::AuthError;

/// Terminal failure of a proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("caller lacks required teams: {}", .missing.join(", "))]
    AuthorizationDenied { missing: Vec<String> },

    #[error("token lacks required scopes: {}", .missing.join(", "))]
    InsufficientScope { missing: Vec<String> },

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("no route matches path {0}")]
    NoRoute(String),

    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Auth(_) => StatusCode::UNAUTHORIZED,
            ProxyError::AuthorizationDenied { .. } | ProxyError::InsufficientScope { .. } => {
                StatusCode::FORBIDDEN
            }
            ProxyError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::NoRoute(_) | ProxyError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human text safe to show the caller. Never includes upstream detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::Auth(AuthError::MissingToken) => "Missing access token",
            ProxyError::Auth(AuthError::MalformedToken(_)) => {
                "Invalid token format, expected 'Bearer <token>'"
            }
            ProxyError::Auth(AuthError::TokenInvalid(_)) => "Invalid or expired token",
            ProxyError::AuthorizationDenied { .. } => "Access to this resource is not allowed",
            ProxyError::InsufficientScope { .. } => "Insufficient permissions",
            ProxyError::RateLimitExceeded => "Rate limit exceeded",
            ProxyError::NoRoute(_) => "No backend configured for this path",
            ProxyError::BackendUnreachable(_) => "Failed to reach backend",
            ProxyError::Internal(_) => "Internal error while proxying the request",
        }
    }

    /// Stable identifier for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Auth(AuthError::MissingToken) => "missing_token",
            ProxyError::Auth(AuthError::MalformedToken(_)) => "malformed_token",
            ProxyError::Auth(AuthError::TokenInvalid(_)) => "token_invalid",
            ProxyError::AuthorizationDenied { .. } => "authorization_denied",
            ProxyError::InsufficientScope { .. } => "insufficient_scope",
            ProxyError::RateLimitExceeded => "rate_limit_exceeded",
            ProxyError::NoRoute(_) => "no_route",
            ProxyError::BackendUnreachable(_) => "backend_unreachable",
            ProxyError::Internal(_) => "internal_error",
        }
    }
}

/// Failure while assembling the server from a validated configuration.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build identity provider client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("no usable user-info URL for protected routes")]
    MissingUserInfoUrl,
}
