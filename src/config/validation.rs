//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate route prefixes and backend targets
//! - Validate value ranges (timeouts > 0)
//! - Ensure protected routes have an identity provider to ask
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `routes[1].target`).
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.timeout_secs",
            "backend timeout must be greater than zero",
        ));
    }

    if config.oauth2.userinfo_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "oauth2.userinfo_timeout_secs",
            "user-info timeout must be greater than zero",
        ));
    }

    if let Some(target) = &config.server.default_target {
        if let Err(message) = check_target(target) {
            errors.push(ValidationError::new("server.default_target", message));
        }
    }

    for (i, route) in config.routes.iter().enumerate() {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("routes[{i}].path"),
                format!("path prefix {:?} must start with '/'", route.path),
            ));
        }
        if let Err(message) = check_target(&route.target) {
            errors.push(ValidationError::new(format!("routes[{i}].target"), message));
        }
        for (j, team) in route.teams.iter().enumerate() {
            if team.name.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("routes[{i}].teams[{j}].name"),
                    "team name must not be empty",
                ));
            }
        }
    }

    let protected = config
        .routes
        .iter()
        .any(|r| !r.teams.is_empty() || !r.scopes.is_empty());
    if protected && config.oauth2.endpoints.resolve_userinfo_url().is_none() {
        errors.push(ValidationError::new(
            "oauth2.endpoints.userinfo_url",
            "protected routes need a user-info URL (or a token URL ending in /token)",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Backends are reached over plain HTTP by the forwarding client.
fn check_target(target: &str) -> Result<(), String> {
    let url = url::Url::parse(target).map_err(|e| format!("invalid URL {target:?}: {e}"))?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}, expected http", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err(format!("target {target:?} has no host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(format!("target {target:?} must not carry a query or fragment"));
    }
    Ok(())
}
