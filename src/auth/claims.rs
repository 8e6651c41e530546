//! Identity claims returned by the user-info endpoint.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::TeamClaim;

/// Claim set for one validated token.
///
/// Absent or `null` fields decode to their empty value, so callers never
/// distinguish "missing" from "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub sub: String,
    #[serde(rename = "uid", deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub given_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub family_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub preferred_username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub groups: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub teams: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub realm_access: RoleSet,
    #[serde(deserialize_with = "null_as_default")]
    pub resource_access: BTreeMap<String, RoleSet>,
    /// Space-delimited OAuth scopes.
    #[serde(deserialize_with = "null_as_default")]
    pub scope: String,
    /// Expiration, seconds since the epoch. Zero when not reported.
    #[serde(rename = "exp", deserialize_with = "null_as_default")]
    pub expires_at: i64,
    #[serde(rename = "iat", deserialize_with = "null_as_default")]
    pub issued_at: i64,
    #[serde(rename = "iss", deserialize_with = "null_as_default")]
    pub issuer: String,
    #[serde(deserialize_with = "null_as_default")]
    pub client_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub token_type: String,
}

/// A `{"roles": [...]}` object as used by realm and resource access claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RoleSet {
    #[serde(deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl TokenInfo {
    /// Realm-level roles.
    pub fn realm_roles(&self) -> &[String] {
        &self.realm_access.roles
    }

    /// Granted scopes, split on whitespace.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }

    /// Whether `scope` was granted.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }

    /// Whether the realm grants `role`.
    pub fn has_realm_role(&self, role: &str) -> bool {
        self.realm_access.roles.iter().any(|r| r == role)
    }

    /// Team memberships read from the configured canonical claim.
    pub fn memberships(&self, claim: TeamClaim) -> &[String] {
        match claim {
            TeamClaim::Groups => &self.groups,
            TeamClaim::Teams => &self.teams,
        }
    }

    /// True if the token reports an expiry that lies before `now` (epoch seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at > 0 && self.expires_at < now
    }

    /// [`is_expired_at`](Self::is_expired_at) against the system clock.
    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        self.is_expired_at(now)
    }
}
