use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    },
    response::IntoResponse,
};
use rodada_core::auth::Account;
use rodada_schema::access::AccessDecision;
use rodada_schema::records::{LoginRequest, SessionView};
use tokio::task::spawn_blocking;
use tracing::info;

use crate::{error::AppError, state::AppState};

pub const SESSION_COOKIE: &str = "rodada_session";

/// Bearer token first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub async fn viewer(state: &Arc<AppState>, headers: &HeaderMap) -> Result<Option<Account>, AppError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    let state = state.clone();
    Ok(spawn_blocking(move || state.accounts.account_for_token(&token)).await??)
}

/// Access decision for the current request, with the signed-in account when there is one.
pub async fn admin_access(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<(AccessDecision, Option<Account>), AppError> {
    let account = viewer(state, headers).await?;
    let decision = state.policy.decide(account.as_ref().map(|a| a.email.as_str()));
    Ok((decision, account))
}

/// Admin gate for the JSON API: 401 without a session, 403 for everyone but the admin.
pub async fn require_admin(state: &Arc<AppState>, headers: &HeaderMap) -> Result<Account, AppError> {
    match admin_access(state, headers).await? {
        (AccessDecision::Granted, Some(account)) => Ok(account),
        (AccessDecision::RedirectHome, _) => Err(AppError::Forbidden),
        _ => Err(AppError::Unauthenticated),
    }
}

fn session_cookie(token: &str, max_age: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}")
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let accounts = state.accounts.clone();
    let session =
        spawn_blocking(move || accounts.sign_in(&payload.email, &payload.password)).await??;

    let is_admin = state.policy.is_admin(&session.account.email);
    info!(email = %session.account.email, is_admin, "signed in");

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, session_cookie(&session.token, state.session_ttl_secs))],
        Json(SessionView {
            email: session.account.email,
            is_admin,
        }),
    ))
}

pub async fn current_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, AppError> {
    let account = viewer(&state, &headers).await?.ok_or(AppError::Unauthenticated)?;
    Ok(Json(SessionView {
        is_admin: state.policy.is_admin(&account.email),
        email: account.email,
    }))
}

pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&headers) {
        let accounts = state.accounts.clone();
        spawn_blocking(move || accounts.sign_out(&token)).await??;
    }
    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, session_cookie("", 0))],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_bearer_before_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; rodada_session=from-cookie"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn ignores_empty_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("rodada_session="));
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
