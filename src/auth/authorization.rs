//! Team and scope authorization.
//!
//! Membership is read from exactly one claim, chosen by `oauth2.team_claim`.
//! There is no fallback between `groups` and `teams`.

use crate::auth::TokenInfo;
use crate::config::TeamClaim;
use crate::error::ProxyError;
use crate::routing::{Route, Team};

/// Decides whether a validated token may use a route.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate {
    claim: TeamClaim,
}

impl AuthorizationGate {
    pub fn new(claim: TeamClaim) -> Self {
        Self { claim }
    }

    pub fn claim(&self) -> TeamClaim {
        self.claim
    }

    /// True if the token holds every team in `required` (vacuously true when empty).
    pub fn authorize(&self, info: &TokenInfo, required: &[Team]) -> bool {
        self.missing_teams(info, required).is_empty()
    }

    /// Required teams the token does not hold, in route order.
    pub fn missing_teams<'a>(&self, info: &TokenInfo, required: &'a [Team]) -> Vec<&'a str> {
        let held = info.memberships(self.claim);
        required
            .iter()
            .map(|team| team.name.as_str())
            .filter(|name| !held.iter().any(|h| h == name))
            .collect()
    }

    /// Full route check: teams first, then scopes.
    pub fn check(&self, info: &TokenInfo, route: &Route) -> Result<(), ProxyError> {
        let missing = self.missing_teams(info, &route.teams);
        if !missing.is_empty() {
            return Err(ProxyError::AuthorizationDenied {
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }

        let missing: Vec<String> = route
            .scopes
            .iter()
            .filter(|scope| !info.has_scope(scope))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ProxyError::InsufficientScope { missing });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams(names: &[&str]) -> Vec<Team> {
        names
            .iter()
            .map(|n| Team {
                name: n.to_string(),
                description: String::new(),
            })
            .collect()
    }

    fn member_of(groups: &[&str]) -> TokenInfo {
        TokenInfo {
            sub: "s".into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_requirement_always_passes() {
        let gate = AuthorizationGate::default();
        assert!(gate.authorize(&member_of(&[]), &[]));
    }

    #[test]
    fn superset_is_authorized() {
        let gate = AuthorizationGate::default();
        let info = member_of(&["ops", "dev", "admin"]);
        assert!(gate.authorize(&info, &teams(&["admin", "dev"])));
        assert!(gate.authorize(&info, &teams(&["admin", "dev", "ops"])));
    }

    #[test]
    fn proper_subset_is_denied() {
        let gate = AuthorizationGate::default();
        let info = member_of(&["dev"]);
        let required = teams(&["dev", "admin", "sre"]);
        assert!(!gate.authorize(&info, &required));
        assert_eq!(gate.missing_teams(&info, &required), vec!["admin", "sre"]);
    }

    #[test]
    fn only_configured_claim_is_consulted() {
        let info = TokenInfo {
            sub: "s".into(),
            teams: vec!["admin".into()],
            ..Default::default()
        };
        let required = teams(&["admin"]);
        assert!(!AuthorizationGate::new(TeamClaim::Groups).authorize(&info, &required));
        assert!(AuthorizationGate::new(TeamClaim::Teams).authorize(&info, &required));
    }

    #[test]
    fn check_reports_teams_then_scopes() {
        let gate = AuthorizationGate::default();
        let route = Route {
            prefix: "/api".into(),
            target: "http://api".into(),
            teams: teams(&["dev"]),
            scopes: vec!["openid".into(), "profile".into()],
            is_default: false,
        };

        let err = gate.check(&member_of(&[]), &route).unwrap_err();
        assert!(matches!(err, ProxyError::AuthorizationDenied { ref missing } if missing == &["dev"]));

        let mut info = member_of(&["dev"]);
        info.scope = "openid email".into();
        let err = gate.check(&info, &route).unwrap_err();
        assert!(matches!(err, ProxyError::InsufficientScope { ref missing } if missing == &["profile"]));

        info.scope = "openid profile email".into();
        assert!(gate.check(&info, &route).is_ok());
    }
}
