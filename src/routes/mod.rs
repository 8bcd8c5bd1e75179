// ============================================================================
// HTTP API
// ============================================================================
//
// JSON-over-HTTP presentation layer for the ledger.
//
// - Player calls carry `x-session-token` (issued by POST /auth/login)
// - Admin calls carry `x-admin-pin`, checked by `AdminGuard` per request
// - Ledger errors map to 4xx with `{"error": ..., "code": ...}`
//
// The ledger sits behind one mutex: every request is a serialized
// transaction against shared state. Argon2 work (login, registration,
// password change, admin PIN) runs on the blocking pool, never under the
// ledger lock.
//
// Sessions expire after `session_ttl`; logging in again replaces the
// user's previous token.

pub mod accounts;
pub mod admin;
pub mod betting;
pub mod wallet;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::auth::{AdminGuard, AdminToken};
use crate::ledger::{Ledger, LedgerError, LedgerResult, Session, User};

pub const SESSION_HEADER: &str = "x-session-token";
pub const ADMIN_PIN_HEADER: &str = "x-admin-pin";

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session: Session,
    pub issued_at: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<Ledger>>,
    pub sessions: Arc<DashMap<String, SessionEntry>>,
    pub admin: Arc<AdminGuard>,
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(ledger: Ledger, admin: AdminGuard) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            sessions: Arc::new(DashMap::new()),
            admin: Arc::new(admin),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn is_expired(&self, entry: &SessionEntry) -> bool {
        entry.issued_at.elapsed() >= self.session_ttl
    }

    /// The caller's session; anonymous if the token is missing, unknown or
    /// expired. Expired entries are evicted here.
    pub fn session(&self, headers: &HeaderMap) -> Session {
        let Some(token) = session_token(headers) else {
            return Session::default();
        };
        let entry = match self.sessions.get(token) {
            Some(entry) => entry.clone(),
            None => return Session::default(),
        };
        if self.is_expired(&entry) {
            self.sessions.remove(token);
            debug!(user_id = ?entry.session.user_id(), "expired session evicted");
            return Session::default();
        }
        entry.session
    }

    /// Store `session` under a fresh token. Drops the user's older tokens
    /// and any expired ones.
    pub fn issue_session(&self, session: Session) -> String {
        let user_id = session.user_id();
        self.sessions
            .retain(|_, entry| entry.session.user_id() != user_id && !self.is_expired(entry));

        let token = Uuid::new_v4().to_string();
        self.sessions.insert(
            token.clone(),
            SessionEntry {
                session,
                issued_at: Instant::now(),
            },
        );
        debug!(user_id = ?user_id, active_sessions = self.sessions.len(), "session issued");
        token
    }

    pub fn end_session(&self, headers: &HeaderMap) -> Option<Session> {
        session_token(headers)
            .and_then(|token| self.sessions.remove(token))
            .map(|(_, entry)| entry.session)
    }

    pub async fn admin_token(&self, headers: &HeaderMap) -> Result<AdminToken, ApiError> {
        let pin = headers
            .get(ADMIN_PIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let guard = self.admin.clone();
        blocking(move || guard.authorize(&pin)).await
    }
}

/// Run Argon2 work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> LedgerResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(reject),
        Err(e) => Err(reject(LedgerError::Credential(format!("credential task failed: {}", e)))),
    }
}

pub(crate) fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

// ============================================================================
// RESPONSES
// ============================================================================

/// A user as the API shows it: no password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub trx_address: String,
    pub avatar: String,
    pub balance: f64,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            trx_address: user.trx_address.clone(),
            avatar: user.avatar.clone(),
            balance: user.balance,
        }
    }
}

pub(crate) fn ok(body: Value) -> ApiResult {
    Ok((StatusCode::OK, Json(body)))
}

/// Stable machine-readable name for each rejection.
pub fn error_code(e: &LedgerError) -> &'static str {
    match e {
        LedgerError::DuplicateEmail(_) => "DuplicateEmail",
        LedgerError::InvalidCredentials => "InvalidCredentials",
        LedgerError::PasswordMismatch => "PasswordMismatch",
        LedgerError::MissingAvatar => "MissingAvatar",
        LedgerError::BettingWindowClosed(_) => "BettingWindowClosed",
        LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
        LedgerError::InvalidAmount(_) => "InvalidAmount",
        LedgerError::InvalidWinningNumber(_) => "InvalidWinningNumber",
        LedgerError::InvalidBetNumber(_) => "InvalidBetNumber",
        LedgerError::NotAuthenticated => "NotAuthenticated",
        LedgerError::Unauthorized => "Unauthorized",
        LedgerError::DepositNotFound(_) => "DepositNotFound",
        LedgerError::WithdrawalNotFound(_) => "WithdrawalNotFound",
        LedgerError::Credential(_) => "Credential",
        LedgerError::Storage(_) => "Storage",
    }
}

pub fn reject(e: LedgerError) -> ApiError {
    let status = match &e {
        LedgerError::DuplicateEmail(_) => StatusCode::CONFLICT,
        LedgerError::InvalidCredentials | LedgerError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        LedgerError::Unauthorized => StatusCode::FORBIDDEN,
        LedgerError::DepositNotFound(_) | LedgerError::WithdrawalNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::BettingWindowClosed(_) | LedgerError::InsufficientBalance { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::Credential(_) | LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": e.to_string(), "code": error_code(&e) })))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Accounts
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/logout", post(accounts::logout))
        .route("/me", get(accounts::me).patch(accounts::update_profile))
        .route("/theme/toggle", post(accounts::toggle_theme))
        // Betting
        .route("/bets", get(betting::my_bets).post(betting::place_bet))
        .route("/draws", get(betting::draws))
        // Wallet
        .route("/wallet/deposit", post(wallet::request_deposit))
        .route("/wallet/withdraw", post(wallet::request_withdrawal))
        // Admin
        .route("/admin/overview", get(admin::overview))
        .route("/admin/winner", post(admin::declare_winner))
        .route("/admin/deposits/{id}/confirm", post(admin::confirm_deposit))
        .route("/admin/withdrawals/{id}/complete", post(admin::complete_withdrawal))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
