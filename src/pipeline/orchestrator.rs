//! Pipeline assembly and per-request driver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::auth::{AuthorizationGate, TokenValidator};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, StartupError};
use crate::http::proxy::ProxyForwarder;
use crate::observability::metrics;
use crate::pipeline::stage::{Stage, ENTRY_STAGES};
use crate::pipeline::RequestContext;
use crate::routing::Router;
use crate::security::RateLimiter;

/// The composed request chain, shared by all requests.
#[derive(Debug)]
pub struct Pipeline {
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) router: Arc<Router>,
    pub(crate) validator: Option<TokenValidator>,
    pub(crate) gate: AuthorizationGate,
    pub(crate) forwarder: ProxyForwarder,
}

impl Pipeline {
    /// Build every stage from a validated configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, StartupError> {
        let router = Router::from_config(&config.routes, config.server.default_target.as_deref());

        let validator = if router.routes().iter().any(|r| r.is_protected()) {
            let url = config
                .oauth2
                .endpoints
                .resolve_userinfo_url()
                .ok_or(StartupError::MissingUserInfoUrl)?;
            let client = reqwest::Client::builder().build()?;
            tracing::info!(userinfo_url = %url, team_claim = %config.oauth2.team_claim, "Token validation enabled");
            Some(
                TokenValidator::new(client, url)
                    .with_timeout(Duration::from_secs(config.oauth2.userinfo_timeout_secs)),
            )
        } else {
            None
        };

        Ok(Self {
            limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            router: Arc::new(router),
            validator,
            gate: AuthorizationGate::new(config.oauth2.team_claim),
            forwarder: ProxyForwarder::new(Duration::from_secs(config.server.timeout_secs)),
        })
    }

    /// Swap the limiter, e.g. for one with a manual clock.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run one request through the chain. Never fails: errors become envelopes.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let mut ctx = RequestContext::from_parts(&parts);

        let response = match self.run(&mut ctx, body).await {
            Ok(response) => response,
            Err(err) => {
                self.report(&ctx, &err);
                err.into_response()
            }
        };

        metrics::record_request(
            ctx.method.as_str(),
            response.status().as_u16(),
            ctx.route_label(),
            start,
        );
        response
    }

    async fn run(&self, ctx: &mut RequestContext, body: Body) -> Result<Response, ProxyError> {
        for stage in ENTRY_STAGES {
            stage.apply(self, ctx).await?;
        }

        let protected = ctx.route.as_ref().is_some_and(|r| r.is_protected());
        for stage in Stage::for_route(protected) {
            stage.apply(self, ctx).await?;
        }

        self.forwarder.forward(ctx, body).await
    }

    fn report(&self, ctx: &RequestContext, err: &ProxyError) {
        let status = err.status_code();
        match err {
            ProxyError::Auth(_)
            | ProxyError::AuthorizationDenied { .. }
            | ProxyError::InsufficientScope { .. } => {
                metrics::record_auth_failure(err.kind());
                tracing::warn!(
                    request_id = %ctx.request_id,
                    path = %ctx.path(),
                    status = status.as_u16(),
                    reason = err.kind(),
                    error = %err,
                    "Request rejected"
                );
            }
            ProxyError::RateLimitExceeded => {
                tracing::debug!(request_id = %ctx.request_id, "Rate limit exceeded");
            }
            _ => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    path = %ctx.path(),
                    route = ctx.route_label(),
                    status = status.as_u16(),
                    error = %err,
                    "Request failed"
                );
            }
        }
    }
}
