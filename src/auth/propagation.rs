//! Claim-to-header projection.
//!
//! Validated claims are exposed to the backend (and echoed to the caller) as
//! a fixed family of headers. The same family is stripped from every inbound
//! request so a client can never pre-set them.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::auth::TokenInfo;

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USER_EMAIL: HeaderName = HeaderName::from_static("x-user-email");
pub const X_USER_NAME: HeaderName = HeaderName::from_static("x-user-name");
pub const X_USER_GIVEN_NAME: HeaderName = HeaderName::from_static("x-user-given-name");
pub const X_USER_FAMILY_NAME: HeaderName = HeaderName::from_static("x-user-family-name");
pub const X_USER_PREFERRED_USERNAME: HeaderName =
    HeaderName::from_static("x-user-preferred-username");
pub const X_TOKEN_SUBJECT: HeaderName = HeaderName::from_static("x-token-subject");
pub const X_USER_GROUPS: HeaderName = HeaderName::from_static("x-user-groups");
pub const X_USER_TEAMS: HeaderName = HeaderName::from_static("x-user-teams");
pub const X_USER_REALM_ROLES: HeaderName = HeaderName::from_static("x-user-realm-roles");
pub const X_TOKEN_SCOPES: HeaderName = HeaderName::from_static("x-token-scopes");
pub const X_TOKEN_TYPE: HeaderName = HeaderName::from_static("x-token-type");
pub const X_TOKEN_ISSUER: HeaderName = HeaderName::from_static("x-token-issuer");
pub const X_CLIENT_ID: HeaderName = HeaderName::from_static("x-client-id");

/// Fixed identity headers, excluding the per-resource role headers.
pub const IDENTITY_HEADERS: [HeaderName; 14] = [
    X_USER_ID,
    X_USER_EMAIL,
    X_USER_NAME,
    X_USER_GIVEN_NAME,
    X_USER_FAMILY_NAME,
    X_USER_PREFERRED_USERNAME,
    X_TOKEN_SUBJECT,
    X_USER_GROUPS,
    X_USER_TEAMS,
    X_USER_REALM_ROLES,
    X_TOKEN_SCOPES,
    X_TOKEN_TYPE,
    X_TOKEN_ISSUER,
    X_CLIENT_ID,
];

const RESOURCE_PREFIX: &str = "x-resource-";
const RESOURCE_SUFFIX: &str = "-roles";

/// Project `info` onto identity headers. Empty fields produce no header.
pub fn propagate(info: &TokenInfo) -> HeaderMap {
    let mut headers = HeaderMap::new();

    set(&mut headers, X_USER_ID, &info.user_id);
    set(&mut headers, X_USER_EMAIL, &info.email);
    set(&mut headers, X_USER_NAME, &info.name);
    set(&mut headers, X_USER_GIVEN_NAME, &info.given_name);
    set(&mut headers, X_USER_FAMILY_NAME, &info.family_name);
    set(&mut headers, X_USER_PREFERRED_USERNAME, &info.preferred_username);
    set(&mut headers, X_TOKEN_SUBJECT, &info.sub);
    set(&mut headers, X_USER_GROUPS, &info.groups.join(","));
    set(&mut headers, X_USER_TEAMS, &info.teams.join(","));
    set(&mut headers, X_USER_REALM_ROLES, &info.realm_roles().join(","));

    for (resource, access) in &info.resource_access {
        match resource_header_name(resource) {
            Some(name) => {
                add_resource_roles(&mut headers, name, resource, &access.roles.join(","));
            }
            None => tracing::warn!(resource = %resource, "Skipping resource roles with unusable name"),
        }
    }

    set(&mut headers, X_TOKEN_SCOPES, &info.scope);
    set(&mut headers, X_TOKEN_TYPE, &info.token_type);
    set(&mut headers, X_TOKEN_ISSUER, &info.issuer);
    set(&mut headers, X_CLIENT_ID, &info.client_id);

    headers
}

fn set(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if value.is_empty() {
        return;
    }
    // from_bytes keeps non-ASCII display names (obs-text) but refuses control characters.
    match HeaderValue::from_bytes(value.as_bytes()) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "Claim value not representable as a header, skipped"),
    }
}

/// Distinct resources can sanitize to one header name; keep every value.
fn add_resource_roles(headers: &mut HeaderMap, name: HeaderName, resource: &str, roles: &str) {
    if roles.is_empty() {
        return;
    }
    let Ok(value) = HeaderValue::from_bytes(roles.as_bytes()) else {
        tracing::warn!(header = %name, "Claim value not representable as a header, skipped");
        return;
    };
    if headers.contains_key(&name) {
        tracing::warn!(
            header = %name,
            resource = %resource,
            "Resource role headers collide, appending"
        );
    }
    headers.append(name, value);
}

/// Replace the identity family in `target` with the values in `identity`.
///
/// Multi-valued identity headers keep all of their values.
pub fn overlay_identity_headers(target: &mut HeaderMap, identity: &HeaderMap) {
    for name in identity.keys() {
        target.remove(name);
    }
    for (name, value) in identity {
        target.append(name.clone(), value.clone());
    }
}

/// `X-Resource-<Resource>-Roles`, with the resource reduced to token characters.
pub fn resource_header_name(resource: &str) -> Option<HeaderName> {
    let sanitized: String = resource
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    if sanitized.trim_matches('-').is_empty() {
        return None;
    }
    HeaderName::from_bytes(format!("X-Resource-{sanitized}-Roles").as_bytes()).ok()
}

/// Whether `name` belongs to the identity header family.
pub fn is_identity_header(name: &HeaderName) -> bool {
    if IDENTITY_HEADERS.contains(name) {
        return true;
    }
    let name = name.as_str();
    name.len() > RESOURCE_PREFIX.len() + RESOURCE_SUFFIX.len()
        && name.starts_with(RESOURCE_PREFIX)
        && name.ends_with(RESOURCE_SUFFIX)
}

/// Remove every identity header from `headers`.
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    let spoofed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_identity_header(name))
        .cloned()
        .collect();

    for name in spoofed {
        tracing::debug!(header = %name, "Dropping client-supplied identity header");
        headers.remove(&name);
    }
}
