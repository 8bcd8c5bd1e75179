// ============================================================================
// ADMIN ROUTES - Winner Declaration, Deposit & Withdrawal Processing
// ============================================================================
//
// Every handler checks `x-admin-pin` before touching the ledger.

use axum::{
    extract::{Json, Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::json;

use super::{ok, reject, ApiResult, AppState, PublicUser};
use crate::ledger::{DepositId, Draw, WithdrawalId};

#[derive(Debug, Deserialize)]
pub struct WinnerRequest {
    pub draw: Draw,
    pub number: String,
}

/// GET /admin/overview - users, bets, pending requests, latest results
pub async fn overview(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    state.admin_token(&headers).await?;
    let ledger = state.ledger.lock();
    let users: Vec<PublicUser> = ledger.users().iter().map(PublicUser::from).collect();

    ok(json!({
        "users": users,
        "bets": ledger.bets(),
        "pendingDeposits": ledger.pending_deposits(),
        "pendingWithdrawals": ledger.pending_withdrawals(),
        "results": ledger.lottery_result(),
    }))
}

/// POST /admin/winner
///
/// Request:
/// ```json
/// { "draw": "day", "number": "42" }
/// ```
pub async fn declare_winner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WinnerRequest>,
) -> ApiResult {
    let admin = state.admin_token(&headers).await?;
    let report = state
        .ledger
        .lock()
        .declare_winner(&admin, req.draw, &req.number)
        .map_err(reject)?;
    ok(json!({ "success": true, "settlement": report }))
}

/// POST /admin/deposits/{id}/confirm
pub async fn confirm_deposit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<DepositId>,
) -> ApiResult {
    let admin = state.admin_token(&headers).await?;
    let confirmation = state
        .ledger
        .lock()
        .confirm_deposit(&admin, id)
        .map_err(reject)?;
    ok(json!({ "success": true, "confirmation": confirmation }))
}

/// POST /admin/withdrawals/{id}/complete
pub async fn complete_withdrawal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<WithdrawalId>,
) -> ApiResult {
    let admin = state.admin_token(&headers).await?;
    let withdrawal = state
        .ledger
        .lock()
        .complete_withdrawal(&admin, id)
        .map_err(reject)?;
    ok(json!({ "success": true, "withdrawal": withdrawal }))
}
