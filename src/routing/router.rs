//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in declaration order
//! - Look up the route for a request path
//! - Fall back to the default target, or report an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - First declared prefix wins, not the longest one

use std::sync::Arc;

use crate::config::{RouteConfig, TeamConfig};
use crate::error::ProxyError;

/// A team a caller must belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Authorization key, compared against the token's team claim.
    pub name: String,
    /// Display only.
    pub description: String,
}

impl From<&TeamConfig> for Team {
    fn from(cfg: &TeamConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            description: cfg.description.clone(),
        }
    }
}

/// A compiled route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Path prefix (case-sensitive).
    pub prefix: String,
    /// Backend base URL.
    pub target: String,
    /// Required teams, all of which must be held. Empty means public.
    pub teams: Vec<Team>,
    /// Required OAuth scopes, all of which must be granted.
    pub scopes: Vec<String>,
    /// True for the synthetic route built from `server.default_target`.
    pub is_default: bool,
}

impl Route {
    /// Returns true if this route handles `path`.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// A route is protected when it demands teams or scopes.
    pub fn is_protected(&self) -> bool {
        !self.teams.is_empty() || !self.scopes.is_empty()
    }

    /// Label used for logs and metrics.
    pub fn label(&self) -> &str {
        if self.is_default {
            "default"
        } else {
            &self.prefix
        }
    }

    fn default_target(target: &str) -> Self {
        Self {
            prefix: "/".to_string(),
            target: target.to_string(),
            teams: Vec::new(),
            scopes: Vec::new(),
            is_default: true,
        }
    }
}

impl From<&RouteConfig> for Route {
    fn from(cfg: &RouteConfig) -> Self {
        Self {
            prefix: cfg.path.clone(),
            target: cfg.target.clone(),
            teams: cfg.teams.iter().map(Team::from).collect(),
            scopes: cfg.scopes.clone(),
            is_default: false,
        }
    }
}

/// Ordered route table.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Arc<Route>>,
    fallback: Option<Arc<Route>>,
}

impl Router {
    /// Compile routes, keeping their configured order.
    pub fn from_config(routes: &[RouteConfig], default_target: Option<&str>) -> Self {
        let routes: Vec<Arc<Route>> = routes.iter().map(|r| Arc::new(Route::from(r))).collect();

        for route in &routes {
            if route.is_protected() {
                tracing::info!(
                    path = %route.prefix,
                    target = %route.target,
                    teams = ?route.teams.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                    scopes = ?route.scopes,
                    "Protected route"
                );
            } else {
                tracing::info!(path = %route.prefix, target = %route.target, "Public route");
            }
        }

        Self {
            routes,
            fallback: default_target.map(|t| Arc::new(Route::default_target(t))),
        }
    }

    /// Find the route for `path`: first prefix match, then the default target.
    pub fn resolve(&self, path: &str) -> Result<Arc<Route>, ProxyError> {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ProxyError::NoRoute(path.to_string()))
    }

    /// Configured routes in evaluation order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }
}
