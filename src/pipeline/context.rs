//! Per-request working set.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{request::Parts, HeaderMap, Method, Uri};
use uuid::Uuid;

use crate::auth::TokenInfo;
use crate::routing::Route;

pub const X_REQUEST_ID: &str = "x-request-id";

/// State accumulated while a request moves through the stages.
///
/// Owned by the request task. Holds the bearer token, so it is deliberately
/// not `Debug`.
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub client_addr: Option<SocketAddr>,
    pub route: Option<Arc<Route>>,
    pub token: Option<String>,
    pub token_info: Option<TokenInfo>,
    /// Identity headers for both the backend request and the response.
    pub identity_headers: HeaderMap,
}

impl RequestContext {
    /// Capture what the stages need from the request head.
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let client_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            request_id,
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            client_addr,
            route: None,
            token: None,
            token_info: None,
            identity_headers: HeaderMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Route label for logs and metrics, `"none"` before routing.
    pub fn route_label(&self) -> &str {
        self.route.as_deref().map(Route::label).unwrap_or("none")
    }
}
