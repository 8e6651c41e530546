//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler and `/ops/*` endpoints
//! - Wire up middleware (tracing, request ID, timeout, hardening)
//! - Bind server to listener and serve until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::{any, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ApplicationConfig, ProxyConfig};
use crate::error::StartupError;
use crate::http::ops;
use crate::pipeline::Pipeline;
use crate::security;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub application: Arc<ApplicationConfig>,
    pub metrics: Option<PrometheusHandle>,
}

/// HTTP server for the authenticating proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig, metrics: Option<PrometheusHandle>) -> Result<Self, StartupError> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self::with_pipeline(config, pipeline, metrics))
    }

    /// Create a server around a prebuilt pipeline.
    pub fn with_pipeline(
        config: ProxyConfig,
        pipeline: Pipeline,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let state = AppState {
            pipeline: Arc::new(pipeline),
            application: Arc::new(config.application.clone()),
            metrics,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        // Ceiling for the whole exchange: identity provider plus backend.
        let ceiling = Duration::from_secs(
            config
                .server
                .timeout_secs
                .saturating_add(config.oauth2.userinfo_timeout_secs),
        );

        let router = Router::new()
            .route("/ops/liveness", get(ops::liveness))
            .route("/ops/readiness", get(ops::readiness))
            .route("/ops/metrics", get(ops::metrics))
            .route("/ops/info", get(ops::info))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state);

        security::headers::apply(router, &config.security)
            .layer(TimeoutLayer::new(ceiling))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Every non-ops request goes through the pipeline.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.pipeline.handle(request).await
}
