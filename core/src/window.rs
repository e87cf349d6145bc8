//! Time-window policy: classifies a slot against the current wall time.
//!
//! Pure function of (slot date, slot code, week status, now, config).
//! CLOSED and FROZEN reject new signups, BUMP_RESTRICTED only allows a
//! second-shift forfeiture bump, OPEN allows normal signup and bumping.

use crate::{
    config::PolicyConfig,
    types::{SlotCode, WeekStatus},
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Open,
    Frozen,
    BumpRestricted,
    Closed,
}

impl WindowState {
    pub fn accepts_signups(&self) -> bool {
        matches!(self, Self::Open | Self::BumpRestricted)
    }
}

pub fn classify(
    date: NaiveDate,
    code: SlotCode,
    week_status: Option<WeekStatus>,
    now: NaiveDateTime,
    cfg: &PolicyConfig,
) -> WindowState {
    // Week status overrides every time rule.
    if let Some(status) = week_status {
        if !status.accepts_signups() {
            return WindowState::Closed;
        }
    }

    let today = now.date();
    match code {
        SlotCode::Early => {
            // Past dates are never frozen.
            if date >= today && now >= early_freeze_at(date, cfg) {
                WindowState::Frozen
            } else {
                WindowState::Open
            }
        }
        SlotCode::Late => {
            if date != today {
                return WindowState::Open;
            }
            let time = now.time();
            if time < cfg.late_restricted_from {
                WindowState::Open
            } else if time <= cfg.late_close {
                WindowState::BumpRestricted
            } else {
                WindowState::Closed
            }
        }
        SlotCode::Weekend => {
            if now >= weekend_freeze_at(date, cfg) {
                WindowState::Frozen
            } else {
                WindowState::Open
            }
        }
    }
}

/// The day before the slot, at the prior-day cutoff.
pub fn early_freeze_at(date: NaiveDate, cfg: &PolicyConfig) -> NaiveDateTime {
    (date - Duration::days(1)).and_time(cfg.prior_day_freeze)
}

/// The configured freeze weekday on or before `date`, at the weekend cutoff.
pub fn weekend_freeze_at(date: NaiveDate, cfg: &PolicyConfig) -> NaiveDateTime {
    let slot_day = i64::from(date.weekday().num_days_from_monday());
    let freeze_day = i64::from(cfg.weekend_freeze_day.num_days_from_monday());
    let days_back = (slot_day - freeze_day).rem_euclid(7);
    (date - Duration::days(days_back)).and_time(cfg.weekend_freeze_time)
}

/// Short kiosk hint for a slot in the given window.
pub fn hint(code: SlotCode, state: WindowState, week_status: Option<WeekStatus>) -> &'static str {
    match (state, week_status) {
        (WindowState::Closed, Some(WeekStatus::Draft)) => "Not yet published",
        (WindowState::Closed, Some(WeekStatus::Closed)) => "Week closed",
        _ => match (code, state) {
            (SlotCode::Early, WindowState::Frozen) => "Frozen after 14:00 day prior",
            (SlotCode::Weekend, WindowState::Frozen) => "Weekend frozen Friday 15:30",
            (SlotCode::Late, WindowState::BumpRestricted) => {
                "2nd-2L forfeiture active; new signups allowed if space"
            }
            (SlotCode::Late, WindowState::Closed) => "Closed at 15:30",
            (_, WindowState::Open) => "Bumping allowed",
            _ => "",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekend_freeze_falls_on_friday_of_that_weekend() {
        let cfg = PolicyConfig::default();
        // 2026-10-17 is a Saturday, 2026-10-18 a Sunday.
        assert_eq!(weekend_freeze_at(day(2026, 10, 17), &cfg), at(2026, 10, 16, 15, 30));
        assert_eq!(weekend_freeze_at(day(2026, 10, 18), &cfg), at(2026, 10, 16, 15, 30));
    }

    #[test]
    fn early_freeze_is_prior_day_cutoff() {
        let cfg = PolicyConfig::default();
        assert_eq!(early_freeze_at(day(2026, 10, 15), &cfg), at(2026, 10, 14, 14, 0));
    }

    #[test]
    fn draft_week_is_closed() {
        let cfg = PolicyConfig::default();
        let state = classify(
            day(2026, 10, 20),
            SlotCode::Late,
            Some(WeekStatus::Draft),
            at(2026, 10, 14, 9, 0),
            &cfg,
        );
        assert_eq!(state, WindowState::Closed);
    }
}
