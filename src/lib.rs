//! TRX Lotto
//!
//! Ledger for a two-draws-a-day numbers lottery.
//!
//! ## Architecture
//!
//! - **Ledger**: users, bets, results, pending deposits/withdrawals
//! - **Settlement**: 10:1 payout sweep per draw/date
//! - **Draw clock**: betting cutoffs (13:10 / 20:10) and payout times
//! - **Storage**: JSON documents in memory, a directory, or ReDB
//! - **Auth**: Argon2id passwords, admin PIN guard
//! - **Server**: Axum JSON API

// Core modules
pub mod clock;
pub mod draw_clock;
pub mod ledger;
pub mod settlement;

// Infrastructure
pub mod auth;
pub mod config;
pub mod routes;
pub mod storage;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use ledger::{
    Bet, BetStatus, DepositConfirmation, DepositInstructions, Draw, Ledger, LedgerError,
    LedgerResult, LedgerSettings, LedgerState, LoginChallenge, LotteryNumber, LotteryResult,
    PendingDeposit, PendingWithdrawal, ProfileUpdate, Registration, RequestStatus, Session,
    Theme, User, VerifiedLogin,
};

pub use settlement::{settle_draw, SettlementReport, PAYOUT_MULTIPLIER};

pub use draw_clock::{is_betting_open, next_draw, DrawCountdown};

pub use clock::{Clock, FixedClock, SystemClock};

pub use auth::{AdminGuard, AdminToken, HashCost, SecretHasher};

pub use storage::{JsonDirStore, KeyValueStore, MemoryStore, RedbStore, StorageError};

pub use config::{LottoConfig, StorageBackend};
