//! Role gate for portal pages.

use super::Session;
use crate::client::{PortalApi, SessionToken};
use crate::domain::{Identity, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(&'static str),
}

/// No identity goes to the landing page; the wrong role goes to its own
/// dashboard.
pub fn decide(required: Role, identity: Option<&Identity>) -> GateDecision {
    match identity {
        None => GateDecision::Redirect("/"),
        Some(identity) if identity.role == required => GateDecision::Allow,
        Some(identity) => GateDecision::Redirect(identity.role.dashboard_path()),
    }
}

/// Ask the backend who owns `token`. Every protected request does this;
/// nothing is cached. Backend failures count as signed out.
pub async fn resolve_session(api: &dyn PortalApi, token: SessionToken) -> Option<Session> {
    match api.current_identity(&token).await {
        Ok(Some(identity)) => Some(Session::new(token, identity)),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Identity check failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: "u1".into(),
            role,
            display_name: "Test".into(),
            email: None,
            lookup_id: None,
        }
    }

    #[test]
    fn test_missing_identity_goes_home() {
        assert_eq!(decide(Role::Staff, None), GateDecision::Redirect("/"));
        assert_eq!(decide(Role::Resident, None), GateDecision::Redirect("/"));
    }

    #[test]
    fn test_wrong_role_goes_to_own_dashboard() {
        assert_eq!(
            decide(Role::Staff, Some(&identity(Role::Resident))),
            GateDecision::Redirect("/portal/dashboard")
        );
        assert_eq!(
            decide(Role::Resident, Some(&identity(Role::Staff))),
            GateDecision::Redirect("/portal/staff")
        );
    }

    #[test]
    fn test_matching_role_allowed() {
        assert_eq!(decide(Role::Staff, Some(&identity(Role::Staff))), GateDecision::Allow);
    }
}
