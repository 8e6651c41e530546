//! Backend forwarding.
//!
//! # Responsibilities
//! - Send the prepared request to the route's target
//! - Bound the exchange, headers and body alike, with the backend timeout
//! - Stream the backend response back, plus identity headers
//!
//! # Design Decisions
//! - One pooled hyper client shared by all requests
//! - No retries; a failed call is a 502
//! - Request and response bodies are never buffered
//! - A body still streaming at the deadline is cut off with an error; the
//!   status has already been sent by then

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::Request;
use axum::response::Response;
use futures_util::{Stream, StreamExt, TryStreamExt};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::time::Instant;

use crate::auth::propagation::overlay_identity_headers;
use crate::error::ProxyError;
use crate::http::request::{backend_uri, outbound_headers};
use crate::observability::metrics;
use crate::pipeline::RequestContext;

/// Forwards requests to backends over plain HTTP.
#[derive(Debug, Clone)]
pub struct ProxyForwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl ProxyForwarder {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward the request described by `ctx` with `body` to its route target.
    pub async fn forward(&self, ctx: &RequestContext, body: Body) -> Result<Response, ProxyError> {
        let route = ctx
            .route
            .as_ref()
            .ok_or_else(|| ProxyError::Internal("forward called before routing".into()))?;

        let uri = backend_uri(&route.target, &ctx.uri)?;
        let mut request = Request::builder()
            .method(ctx.method.clone())
            .uri(uri)
            .body(body)
            .map_err(|e| ProxyError::Internal(format!("failed to build backend request: {e}")))?;
        *request.headers_mut() =
            outbound_headers(&ctx.headers, ctx.client_addr, &ctx.identity_headers);

        tracing::debug!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            backend = %request.uri(),
            "Forwarding request"
        );

        let deadline = deadline_after(self.timeout);
        let exchange = tokio::time::timeout_at(deadline, self.client.request(request));
        let response: Response<Incoming> = match exchange.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                metrics::record_backend_error(route.label());
                return Err(ProxyError::BackendUnreachable(e.to_string()));
            }
            Err(_) => {
                metrics::record_backend_error(route.label());
                return Err(ProxyError::BackendUnreachable(format!(
                    "no response within {:?}",
                    self.timeout
                )));
            }
        };

        let (mut parts, incoming) = response.into_parts();
        overlay_identity_headers(&mut parts.headers, &ctx.identity_headers);

        // The status is already committed once streaming starts; errors only end the body.
        let request_id = ctx.request_id.clone();
        let label = route.label().to_string();
        let stream = until_deadline(Body::new(incoming).into_data_stream(), deadline, self.timeout)
            .inspect_err(move |e| {
                metrics::record_backend_error(&label);
                tracing::warn!(request_id = %request_id, error = %e, "Backend body stream failed");
            });

        Ok(Response::from_parts(parts, Body::from_stream(stream)))
    }
}

/// `now + timeout`, saturating far in the future instead of overflowing.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365 * 30))
}

/// Pass `body` through until `deadline`, then end it with an error.
fn until_deadline<S>(
    body: S,
    deadline: Instant,
    timeout: Duration,
) -> impl Stream<Item = Result<Bytes, axum::Error>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, axum::Error>> + Send + Unpin + 'static,
{
    let sleep = Box::pin(tokio::time::sleep_until(deadline));
    futures_util::stream::unfold(Some((body, sleep)), move |state| async move {
        let (mut body, mut sleep) = state?;
        let next = tokio::select! {
            chunk = body.next() => Some(chunk),
            _ = &mut sleep => None,
        };
        match next {
            Some(chunk) => chunk.map(|chunk| (chunk, Some((body, sleep)))),
            None => {
                let err = axum::Error::new(format!("body not finished within {timeout:?}"));
                Some((Err(err), None))
            }
        }
    })
}
