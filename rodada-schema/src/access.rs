use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessDecision {
    Granted,
    RedirectToLogin,
    RedirectHome,
}

impl AccessDecision {
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            AccessDecision::Granted => None,
            AccessDecision::RedirectToLogin => Some("/login"),
            AccessDecision::RedirectHome => Some("/"),
        }
    }
}

/// Single-address admin allowlist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminPolicy {
    admin_email: Option<String>,
}

impl AdminPolicy {
    pub fn new(admin_email: Option<&str>) -> Self {
        Self {
            admin_email: admin_email
                .map(normalize_email)
                .filter(|email| !email.is_empty()),
        }
    }

    pub fn admin_email(&self) -> Option<&str> {
        self.admin_email.as_deref()
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin == normalize_email(email))
    }

    pub fn decide(&self, viewer_email: Option<&str>) -> AccessDecision {
        match viewer_email {
            None => AccessDecision::RedirectToLogin,
            Some(email) if self.is_admin(email) => AccessDecision::Granted,
            Some(_) => AccessDecision::RedirectHome,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_granted_case_insensitively() {
        let policy = AdminPolicy::new(Some("EventoMujer@gmail.com"));
        assert_eq!(
            policy.decide(Some(" eventomujer@GMAIL.com")),
            AccessDecision::Granted
        );
    }

    #[test]
    fn others_are_redirected() {
        let policy = AdminPolicy::new(Some("admin@rodada.mx"));
        assert_eq!(policy.decide(None), AccessDecision::RedirectToLogin);
        assert_eq!(
            policy.decide(Some("guest@rodada.mx")),
            AccessDecision::RedirectHome
        );
        assert_eq!(AccessDecision::RedirectHome.redirect_target(), Some("/"));
    }

    #[test]
    fn unconfigured_policy_grants_nobody() {
        let policy = AdminPolicy::new(Some("  "));
        assert_eq!(policy.admin_email(), None);
        assert_eq!(policy.decide(Some("")), AccessDecision::RedirectHome);
        assert_eq!(
            AdminPolicy::default().decide(Some("admin@rodada.mx")),
            AccessDecision::RedirectHome
        );
    }
}
