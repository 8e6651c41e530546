//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the authenticating proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Application metadata exposed on `/ops/info`.
    pub application: ApplicationConfig,

    /// Listener and forwarding settings.
    pub server: ServerConfig,

    /// Identity provider settings.
    pub oauth2: OAuth2Config,

    /// Route definitions, evaluated in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// HTTP hardening settings.
    pub security: SecurityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            description: "Authenticating reverse proxy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Listener and forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Listening port.
    pub port: u16,

    /// Backend used when no route matches. `None` turns unmatched paths into 502s.
    pub default_target: Option<String>,

    /// Backend request timeout in seconds. Must be non-zero.
    pub timeout_secs: u64,
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            default_target: None,
            timeout_secs: 30,
        }
    }
}

/// Which token claim carries team membership for authorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamClaim {
    /// The `groups` claim.
    #[default]
    Groups,
    /// The `teams` claim.
    Teams,
}

impl std::fmt::Display for TeamClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamClaim::Groups => f.write_str("groups"),
            TeamClaim::Teams => f.write_str("teams"),
        }
    }
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuth2Config {
    pub endpoints: OAuth2Endpoints,

    /// Canonical team membership claim. Only this claim is consulted.
    pub team_claim: TeamClaim,

    /// User-info call timeout in seconds.
    pub userinfo_timeout_secs: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            endpoints: OAuth2Endpoints::default(),
            team_claim: TeamClaim::default(),
            userinfo_timeout_secs: 10,
        }
    }
}

/// Identity provider endpoint URLs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuth2Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub tokeninfo_url: String,
    pub userinfo_url: String,
}

impl OAuth2Endpoints {
    /// The user-info endpoint, explicit or derived from the token endpoint.
    ///
    /// A token URL whose last path segment is `token` (Keycloak's
    /// `.../openid-connect/token`) maps to the sibling `userinfo` segment.
    pub fn resolve_userinfo_url(&self) -> Option<url::Url> {
        if !self.userinfo_url.is_empty() {
            return url::Url::parse(&self.userinfo_url).ok();
        }
        if self.token_url.is_empty() {
            return None;
        }

        let mut url = url::Url::parse(&self.token_url).ok()?;
        let last = url.path_segments()?.next_back()?.to_string();
        if last != "token" {
            return None;
        }
        url.path_segments_mut().ok()?.pop().push("userinfo");
        Some(url)
    }
}

/// Route configuration mapping a path prefix to a backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix to match (case-sensitive).
    pub path: String,

    /// Backend base URL (e.g., "http://127.0.0.1:3000").
    pub target: String,

    /// Teams the caller must all belong to. Empty means public.
    #[serde(default)]
    pub teams: Vec<TeamConfig>,

    /// OAuth scopes the token must all carry.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// A team referenced by a route.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TeamConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// Rate limiting configuration.
///
/// Values are signed so that a misconfigured negative number parses and is
/// then ignored by the limiter rather than failing startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained requests per second across the whole process.
    pub requests_per_second: i64,

    /// Burst capacity.
    pub burst_size: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 1,
            burst_size: 4,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), or a full filter directive.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Install the Prometheus recorder and serve `/ops/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: true,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add hardening response headers when the backend did not set them.
    pub enable_headers: bool,

    /// Answer CORS preflights and allow any origin.
    pub cors_enabled: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            cors_enabled: true,
        }
    }
}
