//! HTTP API Tests
//!
//! Handlers are called directly with their extractors, the same way the
//! router would invoke them.


use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::Value;
use test_helpers::*;
use trx_lotto::routes::{
    accounts::{self, LoginRequest},
    admin::{self, WinnerRequest},
    betting::{self, BetRequest},
    wallet::{self, AmountRequest},
    ApiResult, AppState, ADMIN_PIN_HEADER, DEFAULT_SESSION_TTL, SESSION_HEADER,
};
use trx_lotto::{Draw, FixedClock, ProfileUpdate};

use std::sync::Arc;
use std::time::Duration;

fn unpack(result: ApiResult) -> (StatusCode, Value) {
    match result {
        Ok((status, Json(body))) | Err((status, Json(body))) => (status, body),
    }
}

fn test_state() -> (AppState, Arc<FixedClock>) {
    let (ledger, clock) = create_test_ledger();
    (AppState::new(ledger, create_admin_guard()), clock)
}

fn session_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SESSION_HEADER, token.parse().unwrap());
    headers
}

fn admin_headers(pin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ADMIN_PIN_HEADER, pin.parse().unwrap());
    headers
}

/// Register `username` over the API and return its session token.
async fn signup(state: &AppState, username: &str) -> String {
    let email = format!("{}@example.com", username);
    let (status, _) = unpack(accounts::register(State(state.clone()), Json(registration(username, &email))).await);
    assert_eq!(status, StatusCode::CREATED);

    let login = LoginRequest { email, password: "s3cret".to_string() };
    let (status, body) = unpack(accounts::login(State(state.clone()), Json(login)).await);
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn deposit(state: &AppState, token: &str, amount: f64) {
    let (status, body) = unpack(
        wallet::request_deposit(State(state.clone()), session_headers(token), Json(AmountRequest { amount })).await,
    );
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["instructions"]["depositId"].as_i64().unwrap();

    let (status, _) = unpack(
        admin::confirm_deposit(State(state.clone()), admin_headers(TEST_ADMIN_PIN), Path(id)).await,
    );
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// ACCOUNTS
// ============================================================================

#[tokio::test]
async fn test_register_hides_password_hash() {
    let (state, _) = test_state();
    let (status, body) = unpack(
        accounts::register(State(state.clone()), Json(registration("ana", "ana@example.com"))).await,
    );

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "ana");
    assert_eq!(body["user"]["balance"], 0.0);
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (state, _) = test_state();
    signup(&state, "ana").await;

    let (status, body) = unpack(
        accounts::register(State(state.clone()), Json(registration("other", "ana@example.com"))).await,
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DuplicateEmail");
}

#[tokio::test]
async fn test_bad_login_unauthorized() {
    let (state, _) = test_state();
    signup(&state, "ana").await;

    let login = LoginRequest { email: "ana@example.com".to_string(), password: "nope".to_string() };
    let (status, body) = unpack(accounts::login(State(state.clone()), Json(login)).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidCredentials");
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;

    let (status, body) = unpack(accounts::me(State(state.clone()), session_headers(&token)).await);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ana@example.com");
    assert_eq!(body["theme"], "dark");

    let (status, _) = unpack(accounts::me(State(state.clone()), session_headers("bogus")).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = unpack(accounts::me(State(state.clone()), HeaderMap::new()).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;

    let (status, _) = unpack(accounts::logout(State(state.clone()), session_headers(&token)).await);
    assert_eq!(status, StatusCode::OK);
    assert!(state.sessions.is_empty());

    let (status, _) = unpack(accounts::me(State(state.clone()), session_headers(&token)).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_profile_over_api() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;

    let update = ProfileUpdate { username: Some("ana-maria".to_string()), ..Default::default() };
    let (status, body) = unpack(
        accounts::update_profile(State(state.clone()), session_headers(&token), Json(update)).await,
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "ana-maria");
}

#[tokio::test]
async fn test_blank_avatar_rejected_over_api() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;

    let update = ProfileUpdate { avatar: Some("   ".to_string()), ..Default::default() };
    let (status, body) = unpack(
        accounts::update_profile(State(state.clone()), session_headers(&token), Json(update)).await,
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MissingAvatar");
}

#[tokio::test]
async fn test_password_change_over_api() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;

    let update = ProfileUpdate { password: Some("n3w-pass".to_string()), ..Default::default() };
    let (status, _) = unpack(
        accounts::update_profile(State(state.clone()), session_headers(&token), Json(update)).await,
    );
    assert_eq!(status, StatusCode::OK);

    let old = LoginRequest { email: "ana@example.com".to_string(), password: "s3cret".to_string() };
    let (status, _) = unpack(accounts::login(State(state.clone()), Json(old)).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let new = LoginRequest { email: "ana@example.com".to_string(), password: "n3w-pass".to_string() };
    let (status, _) = unpack(accounts::login(State(state.clone()), Json(new)).await);
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile_requires_login() {
    let (state, _) = test_state();
    let update = ProfileUpdate { password: Some("n3w-pass".to_string()), ..Default::default() };
    let (status, body) = unpack(
        accounts::update_profile(State(state.clone()), session_headers("bogus"), Json(update)).await,
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "NotAuthenticated");
}

// ============================================================================
// SESSIONS
// ============================================================================

#[tokio::test]
async fn test_login_replaces_previous_token() {
    let (state, _) = test_state();
    assert_eq!(state.session_ttl, DEFAULT_SESSION_TTL);
    let first = signup(&state, "ana").await;
    let bob = signup(&state, "bob").await;

    let mut latest = first.clone();
    for _ in 0..50 {
        let login = LoginRequest { email: "ana@example.com".to_string(), password: "s3cret".to_string() };
        let (status, body) = unpack(accounts::login(State(state.clone()), Json(login)).await);
        assert_eq!(status, StatusCode::OK);
        latest = body["token"].as_str().unwrap().to_string();
    }

    // One token per user, no matter how often they log in.
    assert_eq!(state.sessions.len(), 2);

    let (status, _) = unpack(accounts::me(State(state.clone()), session_headers(&first)).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = unpack(accounts::me(State(state.clone()), session_headers(&latest)).await);
    assert_eq!(status, StatusCode::OK);
    let (status, _) = unpack(accounts::me(State(state.clone()), session_headers(&bob)).await);
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_session_rejected_and_evicted() {
    let (ledger, _) = create_test_ledger();
    let state = AppState::new(ledger, create_admin_guard()).with_session_ttl(Duration::ZERO);
    let token = signup(&state, "ana").await;
    assert_eq!(state.sessions.len(), 1);

    let (status, body) = unpack(accounts::me(State(state.clone()), session_headers(&token)).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "NotAuthenticated");
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn test_toggle_theme_over_api() {
    let (state, _) = test_state();
    let (_, body) = unpack(accounts::toggle_theme(State(state.clone())).await);
    assert_eq!(body["theme"], "light");
}

// ============================================================================
// BETTING
// ============================================================================

#[tokio::test]
async fn test_place_bet_pads_single_digit() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;
    deposit(&state, &token, 10.0).await;

    let req = BetRequest { number: "7".to_string(), amount: 2.0, draw: Draw::Day };
    let (status, body) = unpack(betting::place_bet(State(state.clone()), session_headers(&token), Json(req)).await);

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["bet"]["number"], "07");
    assert_eq!(body["balance"], 8.0);
}

#[tokio::test]
async fn test_place_bet_rejects_bad_number() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;
    deposit(&state, &token, 10.0).await;

    let req = BetRequest { number: "123".to_string(), amount: 1.0, draw: Draw::Day };
    let (status, body) = unpack(betting::place_bet(State(state.clone()), session_headers(&token), Json(req)).await);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidBetNumber");
}

#[tokio::test]
async fn test_closed_window_and_low_balance_unprocessable() {
    let (state, clock) = test_state();
    let token = signup(&state, "ana").await;

    let req = BetRequest { number: "10".to_string(), amount: 5.0, draw: Draw::Day };
    let (status, body) = unpack(betting::place_bet(State(state.clone()), session_headers(&token), Json(req)).await);
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "InsufficientBalance");

    clock.set(at(13, 10));
    let req = BetRequest { number: "10".to_string(), amount: 5.0, draw: Draw::Day };
    let (status, body) = unpack(betting::place_bet(State(state.clone()), session_headers(&token), Json(req)).await);
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "BettingWindowClosed");
}

#[tokio::test]
async fn test_my_bets_newest_first() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;
    deposit(&state, &token, 10.0).await;

    for number in ["01", "02", "03"] {
        let req = BetRequest { number: number.to_string(), amount: 1.0, draw: Draw::Night };
        betting::place_bet(State(state.clone()), session_headers(&token), Json(req)).await.unwrap();
    }

    let (status, body) = unpack(betting::my_bets(State(state.clone()), session_headers(&token)).await);
    assert_eq!(status, StatusCode::OK);
    let numbers: Vec<&str> = body["bets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["03", "02", "01"]);
}

#[tokio::test]
async fn test_draws_reports_countdown() {
    let (state, clock) = test_state();
    clock.set(at(12, 0));

    let (status, body) = unpack(betting::draws(State(state.clone())).await);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next"]["draw"], "day");
    assert_eq!(body["next"]["closesIn"], "01:10:00");
    assert_eq!(body["next"]["paysOutIn"], "01:35:00");
    assert_eq!(body["results"]["day"], Value::Null);
}

// ============================================================================
// WALLET & ADMIN
// ============================================================================

#[tokio::test]
async fn test_admin_routes_require_pin() {
    let (state, _) = test_state();

    let (status, body) = unpack(admin::overview(State(state.clone()), admin_headers("0000")).await);
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "Unauthorized");

    let (status, _) = unpack(admin::overview(State(state.clone()), HeaderMap::new()).await);
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = WinnerRequest { draw: Draw::Day, number: "07".to_string() };
    let (status, _) = unpack(admin::declare_winner(State(state.clone()), admin_headers("0000"), Json(req)).await);
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(state.ledger.lock().lottery_result().get(Draw::Day), None);
}

#[tokio::test]
async fn test_full_round_over_api() {
    let (state, clock) = test_state();
    let token = signup(&state, "ana").await;
    deposit(&state, &token, 50.0).await;

    let req = BetRequest { number: "07".to_string(), amount: 5.0, draw: Draw::Day };
    betting::place_bet(State(state.clone()), session_headers(&token), Json(req)).await.unwrap();

    clock.set(at(13, 35));
    let req = WinnerRequest { draw: Draw::Day, number: "07".to_string() };
    let (status, body) = unpack(
        admin::declare_winner(State(state.clone()), admin_headers(TEST_ADMIN_PIN), Json(req)).await,
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settlement"]["winners"], 1);
    assert_eq!(body["settlement"]["totalPaid"], 50.0);

    let (_, body) = unpack(accounts::me(State(state.clone()), session_headers(&token)).await);
    assert_eq!(body["user"]["balance"], 95.0);

    let (_, body) = unpack(admin::overview(State(state.clone()), admin_headers(TEST_ADMIN_PIN)).await);
    assert_eq!(body["results"]["day"], "07");
    assert_eq!(body["bets"][0]["status"], "win");
    assert!(body["users"][0].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_withdrawal_flow_over_api() {
    let (state, _) = test_state();
    let token = signup(&state, "ana").await;
    deposit(&state, &token, 20.0).await;

    let (status, body) = unpack(
        wallet::request_withdrawal(State(state.clone()), session_headers(&token), Json(AmountRequest { amount: 8.0 }))
            .await,
    );
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["balance"], 12.0);
    assert_eq!(body["withdrawal"]["trxAddress"], "TanaWallet");
    let id = body["withdrawal"]["id"].as_i64().unwrap();

    let (status, body) = unpack(
        admin::complete_withdrawal(State(state.clone()), admin_headers(TEST_ADMIN_PIN), Path(id)).await,
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["withdrawal"]["status"], "completed");

    let (status, body) = unpack(
        admin::complete_withdrawal(State(state.clone()), admin_headers(TEST_ADMIN_PIN), Path(id)).await,
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "WithdrawalNotFound");
}

#[tokio::test]
async fn test_deposit_requires_login_and_positive_amount() {
    let (state, _) = test_state();
    let (status, _) = unpack(
        wallet::request_deposit(State(state.clone()), HeaderMap::new(), Json(AmountRequest { amount: 5.0 })).await,
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = signup(&state, "ana").await;
    let (status, body) = unpack(
        wallet::request_deposit(State(state.clone()), session_headers(&token), Json(AmountRequest { amount: -5.0 }))
            .await,
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidAmount");
}
