//! Request transformation for the backend hop.
//!
//! # Responsibilities
//! - Compute the backend URI from the route target and the original path
//! - Drop hop-by-hop headers, `Host` and client-supplied identity headers
//! - Add `X-Forwarded-*` and the propagated identity headers
//!
//! # Design Decisions
//! - The path is forwarded as-is; route prefixes are not stripped
//! - Identity headers are overlaid last so they always win

use std::net::SocketAddr;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::Uri;

use crate::auth::propagation::overlay_identity_headers;
use crate::auth::strip_identity_headers;
use crate::error::ProxyError;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Connection-scoped headers that must not cross the proxy (RFC 9110 7.6.1).
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// `<target without trailing '/'><original path and query>`.
pub fn backend_uri(target: &str, original: &Uri) -> Result<Uri, ProxyError> {
    let base = target.trim_end_matches('/');
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("{base}{path_and_query}")
        .parse::<Uri>()
        .map_err(|e| ProxyError::Internal(format!("invalid backend uri for {base}: {e}")))
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn remove_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Build the header set sent to the backend.
pub fn outbound_headers(
    inbound: &HeaderMap,
    client_addr: Option<SocketAddr>,
    identity: &HeaderMap,
) -> HeaderMap {
    let mut headers = inbound.clone();
    remove_hop_by_hop(&mut headers);
    let host = headers.remove(header::HOST);
    strip_identity_headers(&mut headers);

    if let Some(addr) = client_addr {
        let ip = addr.ip().to_string();
        let chain = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) if !prior.is_empty() => format!("{prior}, {ip}"),
            _ => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    if let Some(host) = host {
        headers.insert(X_FORWARDED_HOST, host);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));

    overlay_identity_headers(&mut headers, identity);
    headers
}
