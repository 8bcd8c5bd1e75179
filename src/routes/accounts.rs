use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use serde_json::json;

use super::{blocking, ok, reject, ApiResult, AppState, PublicUser};
use crate::ledger::{LedgerError, ProfileUpdate, Registration, Session};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register
pub async fn register(State(state): State<AppState>, Json(req): Json<Registration>) -> ApiResult {
    let hasher = {
        let ledger = state.ledger.lock();
        ledger.check_registration(&req).map_err(reject)?;
        ledger.hasher().clone()
    };

    let password = req.password.clone();
    let password_hash = blocking(move || hasher.hash_secret(&password).map_err(LedgerError::Credential)).await?;

    let user = state
        .ledger
        .lock()
        .register_hashed(req, password_hash)
        .map_err(reject)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": PublicUser::from(&user) })),
    ))
}

/// POST /auth/login - issues a session token
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult {
    let challenge = state.ledger.lock().login_challenge(&req.email).map_err(reject)?;
    let verified = blocking(move || challenge.verify(&req.password)).await?;

    let mut session = Session::new();
    let user = state
        .ledger
        .lock()
        .complete_login(&mut session, verified)
        .map_err(reject)?;

    let token = state.issue_session(session);
    ok(json!({ "token": token, "user": PublicUser::from(&user) }))
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    if let Some(mut session) = state.end_session(&headers) {
        state.ledger.lock().logout(&mut session);
    }
    ok(json!({ "success": true }))
}

/// GET /me
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let session = state.session(&headers);
    let ledger = state.ledger.lock();
    let user = ledger
        .current_user(&session)
        .ok_or_else(|| reject(LedgerError::NotAuthenticated))?;
    ok(json!({ "user": PublicUser::from(user), "theme": ledger.theme() }))
}

/// PATCH /me
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut update): Json<ProfileUpdate>,
) -> ApiResult {
    let session = state.session(&headers);
    let hasher = {
        let ledger = state.ledger.lock();
        ledger.current_user(&session).ok_or_else(|| reject(LedgerError::NotAuthenticated))?;
        ledger.hasher().clone()
    };

    let password_hash = match update.password.take() {
        Some(password) => {
            Some(blocking(move || hasher.hash_secret(&password).map_err(LedgerError::Credential)).await?)
        }
        None => None,
    };

    let user = state
        .ledger
        .lock()
        .update_profile_hashed(&session, update, password_hash)
        .map_err(reject)?;
    ok(json!({ "success": true, "user": PublicUser::from(&user) }))
}

/// POST /theme/toggle
pub async fn toggle_theme(State(state): State<AppState>) -> ApiResult {
    let theme = state.ledger.lock().toggle_theme().map_err(reject)?;
    ok(json!({ "theme": theme }))
}
