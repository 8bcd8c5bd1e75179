// ============================================================================
// TRX LOTTO - LEDGER
// ============================================================================
//
// Owns users, bets, draw results and pending deposit/withdrawal requests.
//
// Every mutating operation follows the same shape:
//   1. check preconditions in order, returning the first failure untouched
//   2. apply all in-memory mutations
//   3. flush every document to the store once
//
// Sessions are caller-held: the ledger never remembers who is logged in.
// Admin operations require an `AdminToken` from `auth::AdminGuard`.
//
// ============================================================================

pub mod types;

pub use types::*;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{verify_secret, AdminToken, HashCost, SecretHasher};
use crate::clock::Clock;
use crate::draw_clock::{self, DrawCountdown};
use crate::settlement::{settle_draw, SettlementReport, PAYOUT_MULTIPLIER};
use crate::storage::{self, KeyValueStore, StorageError};

/// Platform wallet players send deposits to.
pub const DEFAULT_DEPOSIT_ADDRESS: &str = "TAGfZz78D9ekTc7bX3VT4XtuEPCvab1cCK";

// ============================================================================
// ERRORS
// ============================================================================

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("An avatar must be selected")]
    MissingAvatar,

    #[error("Betting is closed for the {0} draw")]
    BettingWindowClosed(Draw),

    #[error("Insufficient balance: {available} < {required}")]
    InsufficientBalance { available: f64, required: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Invalid winning number: {0:?}")]
    InvalidWinningNumber(String),

    #[error("Invalid bet number: {0:?}")]
    InvalidBetNumber(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Admin authorization failed")]
    Unauthorized,

    #[error("Deposit not found: {0}")]
    DepositNotFound(DepositId),

    #[error("Withdrawal not found: {0}")]
    WithdrawalNotFound(WithdrawalId),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// ============================================================================
// SESSION & SETTINGS
// ============================================================================

/// Who is logged in. Held by the caller, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<UserId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub payout_multiplier: f64,
    pub deposit_address: String,
    pub hash_cost: HashCost,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            payout_multiplier: PAYOUT_MULTIPLIER,
            deposit_address: DEFAULT_DEPOSIT_ADDRESS.to_string(),
            hash_cost: HashCost::default(),
        }
    }
}

// ============================================================================
// LEDGER
// ============================================================================

pub struct Ledger {
    state: LedgerState,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    hasher: SecretHasher,
    settings: LedgerSettings,
    last_id: i64,
}

/// A stored password hash, fetched so it can be verified without holding
/// the ledger.
#[derive(Debug, Clone)]
pub struct LoginChallenge {
    user_id: UserId,
    password_hash: String,
}

impl LoginChallenge {
    /// Argon2 verification. Slow: keep it off async workers and outside
    /// any lock around the ledger.
    pub fn verify(self, password: &str) -> LedgerResult<VerifiedLogin> {
        if verify_secret(password, &self.password_hash) {
            Ok(VerifiedLogin {
                user_id: self.user_id,
                password_hash: self.password_hash,
            })
        } else {
            warn!(user_id = self.user_id, "login rejected");
            Err(LedgerError::InvalidCredentials)
        }
    }
}

/// Proof that a password matched a [`LoginChallenge`].
#[derive(Debug)]
pub struct VerifiedLogin {
    user_id: UserId,
    password_hash: String,
}

fn normalized_avatar(avatar: Option<&str>) -> Option<String> {
    avatar
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

impl Ledger {
    /// Load every document from `store` (missing ones start empty).
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        settings: LedgerSettings,
    ) -> LedgerResult<Self> {
        let state = storage::load_state(store.as_ref())?;
        let hasher = SecretHasher::new(settings.hash_cost).map_err(LedgerError::Credential)?;
        let last_id = state.max_id();

        info!(
            users = state.users.len(),
            bets = state.bets.len(),
            payout_multiplier = settings.payout_multiplier,
            "📒 Ledger opened"
        );

        Ok(Self { state, store, clock, hasher, settings, last_id })
    }

    /// Creation timestamp in ms, bumped past the last id handed out.
    fn next_id(&mut self) -> i64 {
        let id = self.clock.now_millis().max(self.last_id + 1);
        self.last_id = id;
        id
    }

    /// Apply `mutate` to a copy of the state, flush the copy, then make it
    /// current. A failed flush leaves the ledger as it was.
    fn commit_with<T>(&mut self, mutate: impl FnOnce(&mut LedgerState) -> T) -> LedgerResult<T> {
        let mut next = self.state.clone();
        let out = mutate(&mut next);
        if let Err(e) = storage::persist_state(self.store.as_ref(), &next) {
            warn!(error = %e, "flush failed, ledger unchanged");
            return Err(e.into());
        }
        self.state = next;
        Ok(out)
    }

    fn session_user_index(&self, session: &Session) -> LedgerResult<usize> {
        let user_id = session.user_id.ok_or(LedgerError::NotAuthenticated)?;
        self.state
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or(LedgerError::NotAuthenticated)
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.state
            .users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    /// The hasher configured for this ledger, for hashing off-lock.
    pub fn hasher(&self) -> &SecretHasher {
        &self.hasher
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    /// Registration checks, in order: password confirmation, avatar, email.
    pub fn check_registration(&self, req: &Registration) -> LedgerResult<()> {
        if req.password != req.confirm_password {
            return Err(LedgerError::PasswordMismatch);
        }
        if normalized_avatar(req.avatar.as_deref()).is_none() {
            return Err(LedgerError::MissingAvatar);
        }
        if self.email_taken(&req.email, None) {
            return Err(LedgerError::DuplicateEmail(req.email.clone()));
        }
        Ok(())
    }

    pub fn register(&mut self, req: Registration) -> LedgerResult<User> {
        self.check_registration(&req)?;
        let password_hash = self
            .hasher
            .hash_secret(&req.password)
            .map_err(LedgerError::Credential)?;
        self.register_hashed(req, password_hash)
    }

    /// [`Ledger::register`] with `req.password` already hashed. The checks
    /// run again, since the email may have been taken meanwhile.
    pub fn register_hashed(&mut self, req: Registration, password_hash: String) -> LedgerResult<User> {
        self.check_registration(&req)?;
        let avatar = normalized_avatar(req.avatar.as_deref()).ok_or(LedgerError::MissingAvatar)?;

        let user = User {
            id: self.next_id(),
            username: req.username,
            email: req.email,
            password_hash,
            trx_address: req.trx_address,
            avatar,
            balance: 0.0,
        };
        self.commit_with(|state| state.users.push(user.clone()))?;

        info!(user_id = user.id, username = %user.username, "✅ User registered");
        Ok(user)
    }

    pub fn login_challenge(&self, email: &str) -> LedgerResult<LoginChallenge> {
        self.state
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| LoginChallenge {
                user_id: u.id,
                password_hash: u.password_hash.clone(),
            })
            .ok_or_else(|| {
                warn!(email, "login rejected");
                LedgerError::InvalidCredentials
            })
    }

    /// Fails if the user is gone or changed password since the challenge.
    pub fn complete_login(&self, session: &mut Session, login: VerifiedLogin) -> LedgerResult<User> {
        let user = self
            .user(login.user_id)
            .filter(|u| u.password_hash == login.password_hash)
            .ok_or(LedgerError::InvalidCredentials)?;

        session.user_id = Some(user.id);
        info!(user_id = user.id, "🔑 Login");
        Ok(user.clone())
    }

    pub fn authenticate(&self, session: &mut Session, email: &str, password: &str) -> LedgerResult<User> {
        let login = self.login_challenge(email)?.verify(password)?;
        self.complete_login(session, login)
    }

    pub fn logout(&self, session: &mut Session) {
        if let Some(user_id) = session.user_id.take() {
            debug!(user_id, "Logout");
        }
    }

    /// Overwrite every field present in `update` on the session's user.
    pub fn update_profile(&mut self, session: &Session, update: ProfileUpdate) -> LedgerResult<User> {
        self.session_user_index(session)?;
        let password_hash = update
            .password
            .as_deref()
            .map(|p| self.hasher.hash_secret(p))
            .transpose()
            .map_err(LedgerError::Credential)?;
        self.update_profile_hashed(session, update, password_hash)
    }

    /// [`Ledger::update_profile`] with the new password already hashed.
    /// `update.password` is ignored; only `password_hash` is stored.
    pub fn update_profile_hashed(
        &mut self,
        session: &Session,
        update: ProfileUpdate,
        password_hash: Option<String>,
    ) -> LedgerResult<User> {
        let idx = self.session_user_index(session)?;
        let user_id = self.state.users[idx].id;

        if let Some(email) = &update.email {
            if self.email_taken(email, Some(user_id)) {
                return Err(LedgerError::DuplicateEmail(email.clone()));
            }
        }
        let avatar = match update.avatar.as_deref() {
            Some(raw) => Some(normalized_avatar(Some(raw)).ok_or(LedgerError::MissingAvatar)?),
            None => None,
        };

        let updated = self.commit_with(|state| {
            let user = &mut state.users[idx];
            if let Some(username) = update.username {
                user.username = username;
            }
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(hash) = password_hash {
                user.password_hash = hash;
            }
            if let Some(trx_address) = update.trx_address {
                user.trx_address = trx_address;
            }
            if let Some(avatar) = avatar {
                user.avatar = avatar;
            }
            user.clone()
        })?;

        info!(user_id, "Profile updated");
        Ok(updated)
    }

    // ========================================================================
    // BETTING
    // ========================================================================

    pub fn place_bet(
        &mut self,
        session: &Session,
        number: LotteryNumber,
        amount: f64,
        draw: Draw,
    ) -> LedgerResult<Bet> {
        let idx = self.session_user_index(session)?;
        let now = self.clock.now();

        if !draw_clock::is_betting_open(draw, now.time()) {
            return Err(LedgerError::BettingWindowClosed(draw));
        }

        let available = self.state.users[idx].balance;
        if available < amount {
            return Err(LedgerError::InsufficientBalance { available, required: amount });
        }
        validate_amount(amount)?;

        let bet = Bet {
            id: self.next_id(),
            user_id: self.state.users[idx].id,
            number,
            amount,
            draw,
            date: now.date(),
            status: BetStatus::Pending,
        };
        self.commit_with(|state| {
            state.users[idx].balance -= amount;
            state.bets.push(bet.clone());
        })?;

        info!(
            bet_id = bet.id,
            user_id = bet.user_id,
            number = %bet.number,
            amount,
            draw = %draw,
            "🎟️ Bet placed"
        );
        Ok(bet)
    }

    /// Record today's winning number for `draw` and settle its pending bets.
    pub fn declare_winner(
        &mut self,
        _admin: &AdminToken,
        draw: Draw,
        number: &str,
    ) -> LedgerResult<SettlementReport> {
        let winning = LotteryNumber::parse(number)
            .ok_or_else(|| LedgerError::InvalidWinningNumber(number.to_string()))?;
        let today = self.clock.today();
        let multiplier = self.settings.payout_multiplier;

        let report = self.commit_with(|state| {
            state.lottery.set(draw, winning.clone());
            settle_draw(&mut state.bets, &mut state.users, draw, today, &winning, multiplier)
        })?;

        info!(
            draw = %draw,
            number = %winning,
            winners = report.winners,
            losers = report.losers,
            total_paid = report.total_paid,
            "🏆 Winner declared"
        );
        Ok(report)
    }

    // ========================================================================
    // DEPOSITS & WITHDRAWALS
    // ========================================================================

    pub fn request_deposit(&mut self, session: &Session, amount: f64) -> LedgerResult<DepositInstructions> {
        let idx = self.session_user_index(session)?;
        validate_amount(amount)?;

        let user = &self.state.users[idx];
        let (user_id, username) = (user.id, user.username.clone());
        let deposit_id = self.next_id();
        self.commit_with(|state| {
            state.pending_deposits.push(PendingDeposit {
                id: deposit_id,
                user_id,
                username,
                amount,
                status: RequestStatus::Pending,
            })
        })?;

        info!(deposit_id, amount, "📥 Deposit requested");
        Ok(DepositInstructions {
            deposit_id,
            amount,
            pay_to_address: self.settings.deposit_address.clone(),
        })
    }

    /// Credit a pending deposit and drop it from the pending set.
    ///
    /// If the depositing user is gone the deposit is still removed, with
    /// `credited == false`.
    pub fn confirm_deposit(&mut self, _admin: &AdminToken, deposit_id: DepositId) -> LedgerResult<DepositConfirmation> {
        let pos = self
            .state
            .pending_deposits
            .iter()
            .position(|d| d.id == deposit_id)
            .ok_or(LedgerError::DepositNotFound(deposit_id))?;

        let confirmation = self.commit_with(|state| {
            let mut deposit = state.pending_deposits.remove(pos);
            let credited = match state.users.iter_mut().find(|u| u.id == deposit.user_id) {
                Some(user) => {
                    user.balance += deposit.amount;
                    true
                }
                None => false,
            };
            deposit.status = RequestStatus::Completed;
            DepositConfirmation { deposit, credited }
        })?;

        if !confirmation.credited {
            warn!(deposit_id, user_id = confirmation.deposit.user_id, "deposit owner missing, nothing credited");
        }
        info!(
            deposit_id,
            amount = confirmation.deposit.amount,
            credited = confirmation.credited,
            "💰 Deposit confirmed"
        );
        Ok(confirmation)
    }

    /// Debit now; the admin pays out off-ledger later.
    pub fn request_withdrawal(&mut self, session: &Session, amount: f64) -> LedgerResult<PendingWithdrawal> {
        let idx = self.session_user_index(session)?;
        let balance = self.state.users[idx].balance;
        if !(amount.is_finite() && amount > 0.0 && amount <= balance) {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let id = self.next_id();
        let user = &self.state.users[idx];
        let request = PendingWithdrawal {
            id,
            user_id: user.id,
            username: user.username.clone(),
            trx_address: user.trx_address.clone(),
            amount,
            status: RequestStatus::Pending,
        };
        self.commit_with(|state| {
            state.users[idx].balance -= amount;
            state.pending_withdrawals.push(request.clone());
        })?;

        info!(
            withdrawal_id = request.id,
            amount,
            trx_address = %request.trx_address,
            "📤 Withdrawal requested"
        );
        Ok(request)
    }

    pub fn complete_withdrawal(
        &mut self,
        _admin: &AdminToken,
        withdrawal_id: WithdrawalId,
    ) -> LedgerResult<PendingWithdrawal> {
        let pos = self
            .state
            .pending_withdrawals
            .iter()
            .position(|w| w.id == withdrawal_id)
            .ok_or(LedgerError::WithdrawalNotFound(withdrawal_id))?;

        let request = self.commit_with(|state| {
            let mut request = state.pending_withdrawals.remove(pos);
            request.status = RequestStatus::Completed;
            request
        })?;

        info!(withdrawal_id, amount = request.amount, "✔️ Withdrawal completed");
        Ok(request)
    }

    // ========================================================================
    // PREFERENCES
    // ========================================================================

    pub fn toggle_theme(&mut self) -> LedgerResult<Theme> {
        self.commit_with(|state| {
            state.theme = state.theme.toggled();
            state.theme
        })
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn users(&self) -> &[User] {
        &self.state.users
    }

    pub fn user(&self, user_id: UserId) -> Option<&User> {
        self.state.users.iter().find(|u| u.id == user_id)
    }

    pub fn current_user(&self, session: &Session) -> Option<&User> {
        session.user_id.and_then(|id| self.user(id))
    }

    pub fn bets(&self) -> &[Bet] {
        &self.state.bets
    }

    pub fn bets_for_user(&self, user_id: UserId) -> Vec<&Bet> {
        self.state.bets.iter().filter(|b| b.user_id == user_id).collect()
    }

    pub fn lottery_result(&self) -> &LotteryResult {
        &self.state.lottery
    }

    pub fn pending_deposits(&self) -> &[PendingDeposit] {
        &self.state.pending_deposits
    }

    pub fn pending_withdrawals(&self) -> &[PendingWithdrawal] {
        &self.state.pending_withdrawals
    }

    pub fn theme(&self) -> Theme {
        self.state.theme
    }

    pub fn draw_countdown(&self) -> DrawCountdown {
        draw_clock::next_draw(self.clock.now())
    }
}
