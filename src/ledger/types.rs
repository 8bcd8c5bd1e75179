// ============================================================================
// LEDGER TYPES — Users, Bets, Draw Results, Pending Money Movements
// ============================================================================
//
// Field names serialize in camelCase so stored documents keep the layout of
// the browser client's localStorage (`userId`, `trxAddress`, ...).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::LedgerError;

pub type UserId = i64;
pub type BetId = i64;
pub type DepositId = i64;
pub type WithdrawalId = i64;

// ============================================================================
// DRAWS & NUMBERS
// ============================================================================

/// One of the two daily lottery events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Draw {
    Day,
    Night,
}

impl Draw {
    pub const ALL: [Draw; 2] = [Draw::Day, Draw::Night];

    pub fn as_str(self) -> &'static str {
        match self {
            Draw::Day => "day",
            Draw::Night => "night",
        }
    }
}

impl fmt::Display for Draw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A two-digit lottery number, `"00"` through `"99"`.
///
/// Validated on construction and on deserialization, so a stored document
/// with a malformed number fails to load instead of entering the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LotteryNumber(String);

impl LotteryNumber {
    /// Strict parse: exactly two ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();
        if bytes.len() == 2 && bytes.iter().all(u8::is_ascii_digit) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    /// Lenient parse for player input: surrounding whitespace is ignored
    /// and a single digit is zero-padded (`"7"` → `"07"`).
    pub fn from_bet_input(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.len() {
            1 if raw.as_bytes()[0].is_ascii_digit() => Some(Self(format!("0{}", raw))),
            _ => Self::parse(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LotteryNumber {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("invalid lottery number: {:?}", raw))
    }
}

impl From<LotteryNumber> for String {
    fn from(number: LotteryNumber) -> Self {
        number.0
    }
}

impl fmt::Display for LotteryNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// USERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub trx_address: String,
    pub avatar: String,
    pub balance: f64,
}

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub trx_address: String,
    pub avatar: Option<String>,
}

/// Partial profile edit. Every `Some` field overwrites the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub trx_address: Option<String>,
    pub avatar: Option<String>,
}

// ============================================================================
// BETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Win,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub number: LotteryNumber,
    pub amount: f64,
    pub draw: Draw,
    pub date: NaiveDate,
    pub status: BetStatus,
}

impl Bet {
    pub fn is_pending(&self) -> bool {
        self.status == BetStatus::Pending
    }
}

/// Most recently declared winning number per draw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryResult {
    pub day: Option<LotteryNumber>,
    pub night: Option<LotteryNumber>,
}

impl LotteryResult {
    pub fn get(&self, draw: Draw) -> Option<&LotteryNumber> {
        match draw {
            Draw::Day => self.day.as_ref(),
            Draw::Night => self.night.as_ref(),
        }
    }

    pub fn set(&mut self, draw: Draw, number: LotteryNumber) {
        match draw {
            Draw::Day => self.day = Some(number),
            Draw::Night => self.night = Some(number),
        }
    }
}

// ============================================================================
// DEPOSITS & WITHDRAWALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeposit {
    pub id: DepositId,
    pub user_id: UserId,
    pub username: String,
    pub amount: f64,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWithdrawal {
    pub id: WithdrawalId,
    pub user_id: UserId,
    pub username: String,
    pub trx_address: String,
    pub amount: f64,
    pub status: RequestStatus,
}

/// What the player must do out-of-band after requesting a deposit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInstructions {
    pub deposit_id: DepositId,
    pub amount: f64,
    pub pay_to_address: String,
}

/// Outcome of an admin deposit confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositConfirmation {
    pub deposit: PendingDeposit,
    /// False when the depositing user no longer exists.
    pub credited: bool,
}

// ============================================================================
// THEME
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

// ============================================================================
// FULL STATE
// ============================================================================

/// Everything the ledger persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    pub users: Vec<User>,
    pub bets: Vec<Bet>,
    pub lottery: LotteryResult,
    pub pending_deposits: Vec<PendingDeposit>,
    pub pending_withdrawals: Vec<PendingWithdrawal>,
    pub theme: Theme,
}

impl LedgerState {
    /// Largest id in use across every entity list.
    pub fn max_id(&self) -> i64 {
        let users = self.users.iter().map(|u| u.id);
        let bets = self.bets.iter().map(|b| b.id);
        let deposits = self.pending_deposits.iter().map(|d| d.id);
        let withdrawals = self.pending_withdrawals.iter().map(|w| w.id);
        users.chain(bets).chain(deposits).chain(withdrawals).max().unwrap_or(0)
    }
}

/// Amounts must be finite and strictly positive.
pub(crate) fn validate_amount(amount: f64) -> Result<(), LedgerError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(amount))
    }
}
