//! Formatting and routing helpers that do not touch the DOM.

use rodada_schema::access::{AccessDecision, AdminPolicy};
use rodada_schema::pricing::JerseyRequest;
use rodada_schema::records::SessionView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Register,
    Login,
    Admin,
}

impl Page {
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/admin" => Page::Admin,
            "/login" => Page::Login,
            _ => Page::Register,
        }
    }
}

/// Client-side mirror of the dashboard gate. The server only reports
/// whether the session is the admin, so the policy is built from that.
pub fn admin_gate(session: Option<&SessionView>) -> AccessDecision {
    let admin = session.filter(|s| s.is_admin).map(|s| s.email.as_str());
    AdminPolicy::new(admin).decide(session.map(|s| s.email.as_str()))
}

/// `$1,680 MXN`
pub fn mxn(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped} MXN")
}

const MONTHS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// `2026-03-08T15:04:05.000Z` as `08 mar 2026`. Anything unparseable is shown as is.
pub fn short_date(created_at: &str) -> String {
    parse_date(created_at).unwrap_or_else(|| created_at.to_string())
}

fn parse_date(created_at: &str) -> Option<String> {
    let date = created_at.split('T').next()?;
    let mut parts = date.splitn(3, '-');
    let year = parts.next()?;
    let month: usize = parts.next()?.parse().ok()?;
    let day = parts.next()?;
    let month = MONTHS.get(month.checked_sub(1)?)?;
    Some(format!("{day} {month} {year}"))
}

pub fn jersey_label(jersey: &JerseyRequest) -> String {
    match (jersey.wanted, jersey.size) {
        (true, Some(size)) => size.label().to_string(),
        (true, None) => "?".to_string(),
        (false, _) => "—".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rodada_schema::pricing::JerseySize;

    #[test]
    fn routes_by_path() {
        assert_eq!(Page::from_path("/admin"), Page::Admin);
        assert_eq!(Page::from_path("/admin/"), Page::Admin);
        assert_eq!(Page::from_path("/login"), Page::Login);
        assert_eq!(Page::from_path("/"), Page::Register);
        assert_eq!(Page::from_path("/registro"), Page::Register);
    }

    #[test]
    fn gate_sends_strangers_to_login_and_others_home() {
        assert_eq!(admin_gate(None), AccessDecision::RedirectToLogin);

        let volunteer = SessionView {
            email: "voluntaria@rodada.mx".into(),
            is_admin: false,
        };
        assert_eq!(admin_gate(Some(&volunteer)), AccessDecision::RedirectHome);

        let admin = SessionView {
            email: "eventomujer@gmail.com".into(),
            is_admin: true,
        };
        assert_eq!(admin_gate(Some(&admin)), AccessDecision::Granted);
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(mxn(0), "$0 MXN");
        assert_eq!(mxn(280), "$280 MXN");
        assert_eq!(mxn(1680), "$1,680 MXN");
        assert_eq!(mxn(1_234_560), "$1,234,560 MXN");
    }

    #[test]
    fn formats_creation_dates() {
        assert_eq!(short_date("2026-03-08T15:04:05.000Z"), "08 mar 2026");
        assert_eq!(short_date("2026-12-31T00:00:00Z"), "31 dic 2026");
        assert_eq!(short_date("pendiente"), "pendiente");
        assert_eq!(short_date("2026-13-01T00:00:00Z"), "2026-13-01T00:00:00Z");
    }

    #[test]
    fn labels_jerseys() {
        assert_eq!(jersey_label(&JerseyRequest::sized(JerseySize::XL)), "XL");
        assert_eq!(jersey_label(&JerseyRequest::none()), "—");
    }
}
