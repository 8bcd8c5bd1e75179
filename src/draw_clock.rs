//! Daily draw schedule.
//!
//! Two draws a day, each with a betting cutoff and a later payout
//! declaration:
//!
//! | Draw  | Betting closes | Payout declared |
//! |-------|----------------|-----------------|
//! | day   | 13:10          | 13:35           |
//! | night | 20:10          | 21:50           |
//!
//! [`is_betting_open`] gates bet placement; [`next_draw`] drives the
//! countdown shown to players. Both read the same constants.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::ledger::Draw;

/// Minute of day at which day-draw betting closes (13:10).
pub const DAY_BETTING_CLOSE: u32 = 13 * 60 + 10;
/// Minute of day at which the day draw is declared (13:35).
pub const DAY_PAYOUT: u32 = 13 * 60 + 35;
/// Minute of day at which night-draw betting closes (20:10).
pub const NIGHT_BETTING_CLOSE: u32 = 20 * 60 + 10;
/// Minute of day at which the night draw is declared (21:50).
pub const NIGHT_PAYOUT: u32 = 21 * 60 + 50;

const SECONDS_PER_DAY: i64 = 86_400;

impl Draw {
    pub const fn betting_close_minute(self) -> u32 {
        match self {
            Draw::Day => DAY_BETTING_CLOSE,
            Draw::Night => NIGHT_BETTING_CLOSE,
        }
    }

    pub const fn payout_minute(self) -> u32 {
        match self {
            Draw::Day => DAY_PAYOUT,
            Draw::Night => NIGHT_PAYOUT,
        }
    }
}

/// Whether bets on `draw` are still accepted at local time `now`.
///
/// Minute granularity: 13:09:59 is open, 13:10:00 is closed.
pub fn is_betting_open(draw: Draw, now: NaiveTime) -> bool {
    now.hour() * 60 + now.minute() < draw.betting_close_minute()
}

/// The next draw still open for betting, and how long until it closes and
/// pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCountdown {
    pub draw: Draw,
    pub draw_date: NaiveDate,
    pub until_close: Duration,
    pub until_payout: Duration,
}

impl DrawCountdown {
    pub fn close_display(&self) -> String {
        format_countdown(self.until_close)
    }

    pub fn payout_display(&self) -> String {
        format_countdown(self.until_payout)
    }
}

/// Countdown to the next draw at local time `now`.
///
/// Before 13:10 that is today's day draw, before 20:10 today's night draw,
/// after that tomorrow's day draw.
pub fn next_draw(now: NaiveDateTime) -> DrawCountdown {
    let secs = now.time().num_seconds_from_midnight() as i64;
    let today = now.date();

    let (draw, draw_date, offset) = if secs < cutoff_secs(Draw::Day) {
        (Draw::Day, today, 0)
    } else if secs < cutoff_secs(Draw::Night) {
        (Draw::Night, today, 0)
    } else {
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
        (Draw::Day, tomorrow, SECONDS_PER_DAY)
    };

    DrawCountdown {
        draw,
        draw_date,
        until_close: Duration::seconds(cutoff_secs(draw) + offset - secs),
        until_payout: Duration::seconds(draw.payout_minute() as i64 * 60 + offset - secs),
    }
}

fn cutoff_secs(draw: Draw) -> i64 {
    draw.betting_close_minute() as i64 * 60
}

/// `HH:MM:SS`; negative durations render as `00:00:00`.
pub fn format_countdown(remaining: Duration) -> String {
    if remaining < Duration::zero() {
        return "00:00:00".to_string();
    }
    let total = remaining.num_seconds();
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
