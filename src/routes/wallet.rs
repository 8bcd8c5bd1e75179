use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use serde_json::json;

use super::{reject, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: f64,
}

/// POST /wallet/deposit - records the request, returns payment instructions
pub async fn request_deposit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> ApiResult {
    let session = state.session(&headers);
    let instructions = state
        .ledger
        .lock()
        .request_deposit(&session, req.amount)
        .map_err(reject)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "instructions": instructions,
            "message": format!(
                "Send exactly {} TRX to {}. Your balance updates once an administrator confirms the transfer.",
                instructions.amount, instructions.pay_to_address
            ),
        })),
    ))
}

/// POST /wallet/withdraw - debits now, admin pays out manually
pub async fn request_withdrawal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> ApiResult {
    let session = state.session(&headers);
    let mut ledger = state.ledger.lock();
    let request = ledger
        .request_withdrawal(&session, req.amount)
        .map_err(reject)?;
    let balance = ledger.current_user(&session).map(|u| u.balance);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "withdrawal": request,
            "balance": balance,
            "message": format!("{} TRX will be sent to {}", request.amount, request.trx_address),
        })),
    ))
}
