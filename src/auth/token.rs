//! Bearer token extraction.

use axum::http::{header, HeaderMap};

use crate::auth::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the bearer token out of the `Authorization` header.
///
/// The scheme must be exactly `Bearer ` (case-sensitive, one space); the rest,
/// trimmed, is the token.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let value = value
        .to_str()
        .map_err(|_| AuthError::MalformedToken("header is not valid ASCII"))?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedToken("expected 'Bearer <token>'"))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedToken("empty token after 'Bearer'"));
    }

    Ok(token.to_string())
}
