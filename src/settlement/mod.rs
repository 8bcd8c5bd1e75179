//! Settlement - resolving one draw's pending bets against a winning number
//!
//! ## Flow:
//! 1. Admin declares the winning number for a draw
//! 2. Every pending bet on that draw for that date is resolved
//! 3. Matching numbers win and their owner is credited `stake × multiplier`
//! 4. Everything else on that draw/date loses
//!
//! Already-settled bets are skipped, so declaring the same draw twice pays
//! nothing the second time.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ledger::{Bet, BetStatus, Draw, LotteryNumber, User};

/// Fixed payout ratio: a winning stake returns ten times its amount.
pub const PAYOUT_MULTIPLIER: f64 = 10.0;

/// Summary of one settlement sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub draw: Draw,
    pub date: NaiveDate,
    pub winning_number: LotteryNumber,
    pub winners: usize,
    pub losers: usize,
    pub total_paid: f64,
    /// Winning bets whose owner no longer exists; resolved but not paid.
    pub unpaid_orphans: usize,
}

impl SettlementReport {
    pub fn settled(&self) -> usize {
        self.winners + self.losers
    }
}

/// Resolve every pending `draw` bet dated `date`.
pub fn settle_draw(
    bets: &mut [Bet],
    users: &mut [User],
    draw: Draw,
    date: NaiveDate,
    winning_number: &LotteryNumber,
    multiplier: f64,
) -> SettlementReport {
    let mut report = SettlementReport {
        draw,
        date,
        winning_number: winning_number.clone(),
        winners: 0,
        losers: 0,
        total_paid: 0.0,
        unpaid_orphans: 0,
    };

    for bet in bets
        .iter_mut()
        .filter(|b| b.draw == draw && b.date == date && b.is_pending())
    {
        if &bet.number != winning_number {
            bet.status = BetStatus::Loss;
            report.losers += 1;
            continue;
        }

        bet.status = BetStatus::Win;
        report.winners += 1;

        let payout = bet.amount * multiplier;
        match users.iter_mut().find(|u| u.id == bet.user_id) {
            Some(user) => {
                user.balance += payout;
                report.total_paid += payout;
                debug!(bet_id = bet.id, user_id = user.id, payout, "winning bet paid");
            }
            None => {
                report.unpaid_orphans += 1;
                warn!(bet_id = bet.id, user_id = bet.user_id, "winning bet has no owner, payout skipped");
            }
        }
    }

    report
}
