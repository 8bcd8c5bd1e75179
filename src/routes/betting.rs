use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use serde_json::json;

use super::{ok, reject, ApiResult, AppState};
use crate::ledger::{Draw, LedgerError, LotteryNumber};

#[derive(Debug, Deserialize)]
pub struct BetRequest {
    /// `"7"` and `"07"` are both accepted.
    pub number: String,
    pub amount: f64,
    pub draw: Draw,
}

/// POST /bets
pub async fn place_bet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BetRequest>,
) -> ApiResult {
    let session = state.session(&headers);
    let number = LotteryNumber::from_bet_input(&req.number)
        .ok_or_else(|| reject(LedgerError::InvalidBetNumber(req.number.clone())))?;

    let mut ledger = state.ledger.lock();
    let bet = ledger
        .place_bet(&session, number, req.amount, req.draw)
        .map_err(reject)?;
    let balance = ledger.current_user(&session).map(|u| u.balance);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "bet": bet,
            "balance": balance,
            "message": format!("Bet of {} TRX on number {} placed", bet.amount, bet.number),
        })),
    ))
}

/// GET /bets - the caller's bet history, newest first
pub async fn my_bets(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let session = state.session(&headers);
    let ledger = state.ledger.lock();
    let user = ledger
        .current_user(&session)
        .ok_or_else(|| reject(LedgerError::NotAuthenticated))?;

    let mut bets = ledger.bets_for_user(user.id);
    bets.reverse();
    ok(json!({ "bets": bets }))
}

/// GET /draws - countdown to the next draw plus the latest results
pub async fn draws(State(state): State<AppState>) -> ApiResult {
    let ledger = state.ledger.lock();
    let countdown = ledger.draw_countdown();
    ok(json!({
        "next": {
            "draw": countdown.draw,
            "drawDate": countdown.draw_date,
            "closesIn": countdown.close_display(),
            "paysOutIn": countdown.payout_display(),
        },
        "results": ledger.lottery_result(),
    }))
}
