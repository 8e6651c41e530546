//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use auth_proxy::config::{ProxyConfig, RouteConfig, TeamConfig};
use auth_proxy::{HttpServer, Shutdown};
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use futures_util::{stream, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Backend that echoes what it received as JSON.
///
/// - `POST /api/created` answers 201 with `X-Custom: v` and the request body verbatim
/// - `/public/slow` answers after three seconds
/// - `/public/stall` answers 200, sends `head` and never finishes the body
pub async fn start_mock_backend() -> SocketAddr {
    let app = Router::new()
        .route("/api/created", post(created))
        .route("/public/slow", any(slow))
        .route("/public/stall", any(stall))
        .fallback(echo);
    serve(app).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn created(body: Bytes) -> impl IntoResponse {
    (StatusCode::CREATED, [("x-custom", "v")], body)
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "late"
}

async fn stall() -> Body {
    let head = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b"head")) });
    Body::from_stream(head.chain(stream::pending()))
}

/// Identity provider whose `/userinfo` knows a fixed set of tokens.
pub async fn start_mock_idp() -> SocketAddr {
    serve(Router::new().route("/userinfo", get(userinfo))).await
}

async fn userinfo(headers: HeaderMap) -> axum::response::Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    let claims = match token {
        "dev-token" => json!({
            "sub": "sub-dev",
            "uid": "user-1",
            "email": "dev@example.com",
            "name": "Dana Developer",
            "groups": ["developers"],
            "scope": "openid profile",
            "iss": "http://idp.test/realms/demo",
        }),
        "admin-token" => json!({
            "sub": "sub-admin",
            "uid": "user-2",
            "email": "admin@example.com",
            "groups": ["admin", "developers"],
            "realm_access": { "roles": ["platform-admin"] },
            "resource_access": { "account": { "roles": ["manage-account"] } },
            "scope": "openid profile email",
            "client_id": "console",
        }),
        "admin-no-scope" => json!({
            "sub": "sub-admin-2",
            "groups": ["admin"],
            "scope": "openid",
        }),
        "teams-only" => json!({
            "sub": "sub-teams",
            "teams": ["developers"],
            "groups": null,
        }),
        "no-sub" => json!({ "email": "ghost@example.com", "groups": ["developers"] }),
        "slow-token" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            json!({ "sub": "late" })
        }
        _ => {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_token" })))
                .into_response()
        }
    };
    Json(claims).into_response()
}

fn team(name: &str) -> TeamConfig {
    TeamConfig {
        name: name.to_string(),
        description: String::new(),
    }
}

/// Gateway config pointing at the mocks.
///
/// Routes, in order: `/public` (open), `/api/admin` (team `admin` + openid/profile),
/// `/api` (team `developers`), `/down` (open, nothing listening). No default target.
pub fn gateway_config(backend: SocketAddr, idp: SocketAddr) -> ProxyConfig {
    let target = format!("http://{backend}");
    let mut config = ProxyConfig::default();
    config.server.timeout_secs = 1;
    config.oauth2.userinfo_timeout_secs = 1;
    config.oauth2.endpoints.userinfo_url = format!("http://{idp}/userinfo");
    config.rate_limit.requests_per_second = 1000;
    config.rate_limit.burst_size = 1000;
    config.routes = vec![
        RouteConfig {
            path: "/public".into(),
            target: target.clone(),
            teams: Vec::new(),
            scopes: Vec::new(),
        },
        RouteConfig {
            path: "/api/admin".into(),
            target: target.clone(),
            teams: vec![team("admin")],
            scopes: vec!["openid".into(), "profile".into()],
        },
        RouteConfig {
            path: "/api".into(),
            target,
            teams: vec![team("developers")],
            scopes: Vec::new(),
        },
        RouteConfig {
            path: "/down".into(),
            target: "http://127.0.0.1:1".into(),
            teams: Vec::new(),
            scopes: Vec::new(),
        },
    ];
    config
}

/// A running gateway. Dropping it stops the server.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_gateway(config: ProxyConfig) -> TestGateway {
    let server = HttpServer::new(config, None).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    TestGateway { addr, shutdown }
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
