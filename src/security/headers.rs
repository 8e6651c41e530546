//! Response hardening and CORS.
//!
//! # Responsibilities
//! - Add hardening response headers the backend did not set
//! - Answer CORS preflights when enabled
//!
//! # Design Decisions
//! - Headers are only added if not present, so backends keep control
//! - CORS mirrors a permissive default: any origin, common methods, no credentials

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::schema::SecurityConfig;

/// Layer the configured hardening onto `router`.
pub fn apply<S>(router: Router<S>, config: &SecurityConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = router;

    if config.enable_headers {
        router = router
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ));
    }

    if config.cors_enabled {
        router = router.layer(cors_layer());
    }

    router
}

/// Any origin, the usual methods, any request header.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}
