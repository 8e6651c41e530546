//! Token validation against the identity provider's user-info endpoint.
//!
//! # Responsibilities
//! - One GET per request with the caller's bearer token
//! - Bound the call with a timeout
//! - Decode and normalize the claim set
//!
//! # Design Decisions
//! - Any non-200, transport error, timeout or decode error is `TokenInvalid`
//! - No retries and no caching; a token is re-checked on every request
//! - The call future is owned by the request task, so a client disconnect
//!   drops it and aborts the outbound request

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::auth::{AuthError, TokenInfo};

/// Default user-info call timeout.
pub const USERINFO_TIMEOUT: Duration = Duration::from_secs(10);

/// Validates bearer tokens by asking the identity provider who they belong to.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    client: Client,
    userinfo_url: Url,
    timeout: Duration,
}

impl TokenValidator {
    /// Create a validator for `userinfo_url` with the default timeout.
    pub fn new(client: Client, userinfo_url: Url) -> Self {
        Self {
            client,
            userinfo_url,
            timeout: USERINFO_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn userinfo_url(&self) -> &Url {
        &self.userinfo_url
    }

    /// Resolve `token` into its claim set.
    pub async fn validate(&self, token: &str) -> Result<TokenInfo, AuthError> {
        let response = self
            .client
            .get(self.userinfo_url.clone())
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::TokenInvalid(format!(
                        "userinfo endpoint did not answer within {:?}",
                        self.timeout
                    ))
                } else {
                    AuthError::TokenInvalid(format!("userinfo request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AuthError::TokenInvalid(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AuthError::TokenInvalid(format!("failed to decode user info: {e}")))?;

        normalize(info)
    }
}

/// Enforce mandatory claims and fill defaults.
fn normalize(mut info: TokenInfo) -> Result<TokenInfo, AuthError> {
    if info.sub.is_empty() {
        return Err(AuthError::TokenInvalid(
            "missing required claim 'sub' in user info".to_string(),
        ));
    }
    if info.is_expired() {
        return Err(AuthError::TokenInvalid(format!(
            "token expired at {}",
            info.expires_at
        )));
    }
    if info.token_type.is_empty() {
        info.token_type = "Bearer".to_string();
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn userinfo(headers: HeaderMap) -> axum::response::Response {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        match auth {
            "Bearer good" => Json(json!({"sub": "s-1", "uid": "u-1", "groups": ["dev"]})).into_response(),
            "Bearer nosub" => Json(json!({"uid": "u-1"})).into_response(),
            "Bearer bare" => Json(json!({"sub": "s-2"})).into_response(),
            "Bearer expired" => Json(json!({"sub": "s-3", "exp": 1})).into_response(),
            "Bearer garbage" => (AxumStatus::OK, "not json").into_response(),
            "Bearer slow" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"sub": "late"})).into_response()
            }
            _ => AxumStatus::UNAUTHORIZED.into_response(),
        }
    }

    async fn start_idp() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/userinfo", get(userinfo));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn test_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    async fn validator() -> TokenValidator {
        let addr = start_idp().await;
        let url = Url::parse(&format!("http://{addr}/userinfo")).unwrap();
        TokenValidator::new(test_client(), url).with_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn valid_token_yields_claims() {
        let info = validator().await.validate("good").await.unwrap();
        assert_eq!(info.sub, "s-1");
        assert_eq!(info.user_id, "u-1");
        assert_eq!(info.groups, vec!["dev"]);
        assert_eq!(info.token_type, "Bearer");
    }

    #[tokio::test]
    async fn missing_sub_is_invalid() {
        let err = validator().await.validate("nosub").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(ref m) if m.contains("sub")));
    }

    #[tokio::test]
    async fn absent_groups_normalize_to_empty() {
        let info = validator().await.validate("bare").await.unwrap();
        assert!(info.groups.is_empty());
        assert!(info.teams.is_empty());
        assert!(info.resource_access.is_empty());
    }

    #[tokio::test]
    async fn rejected_and_undecodable_tokens_are_invalid() {
        let v = validator().await;
        for token in ["unknown", "garbage", "expired"] {
            assert!(
                matches!(v.validate(token).await, Err(AuthError::TokenInvalid(_))),
                "{token}"
            );
        }
    }

    #[tokio::test]
    async fn slow_identity_provider_times_out() {
        let started = std::time::Instant::now();
        let err = validator().await.validate("slow").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(ref m) if m.contains("did not answer")));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn unreachable_identity_provider_is_invalid() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/userinfo")).unwrap();
        let v = TokenValidator::new(test_client(), url);
        assert!(matches!(v.validate("good").await, Err(AuthError::TokenInvalid(_))));
    }

    #[test]
    fn normalize_defaults_token_type() {
        let info = normalize(TokenInfo {
            sub: "s".into(),
            token_type: String::new(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(info.token_type, "Bearer");
    }
}
