//! Policy configuration: freeze cutoffs, daily limits, seniority basis.
//!
//! Loaded once at startup from `{data_dir}/policy.json` and handed to the
//! engine by value. Decision code never reads the environment.

use crate::types::WeekStatus;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// How "more senior" is decided between two employees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityBasis {
    /// Lower clock number is more senior.
    #[default]
    ClockNumber,
    /// Higher explicit rank is more senior; an unranked employee counts as
    /// rank 0 and clock number breaks ties.
    Rank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Early slots freeze at this time on the day before.
    #[serde(with = "hhmm")]
    pub prior_day_freeze: NaiveTime,
    /// Today's late slot enters the restricted bump window at this time.
    #[serde(with = "hhmm")]
    pub late_restricted_from: NaiveTime,
    /// Today's late slot closes after this time (inclusive bound of the window).
    #[serde(with = "hhmm")]
    pub late_close: NaiveTime,
    /// Weekend slots freeze on this weekday of the same week...
    pub weekend_freeze_day: Weekday,
    /// ...at this time.
    #[serde(with = "hhmm")]
    pub weekend_freeze_time: NaiveTime,
    pub early_daily_limit: u32,
    pub late_daily_limit: u32,
    pub seniority_basis: SeniorityBasis,
    /// Day-shift workers outrank rotating workers before seniority is consulted.
    pub shift_priority: bool,
    /// Status given to weeks created by `create_week`.
    pub default_week_status: WeekStatus,
    /// How long a kiosk waits for another kiosk's slot lock.
    pub busy_timeout_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            prior_day_freeze: hm(14, 0),
            late_restricted_from: hm(14, 0),
            late_close: hm(15, 30),
            weekend_freeze_day: Weekday::Fri,
            weekend_freeze_time: hm(15, 30),
            early_daily_limit: 1,
            late_daily_limit: 2,
            seniority_basis: SeniorityBasis::ClockNumber,
            shift_priority: false,
            default_week_status: WeekStatus::Published,
            busy_timeout_ms: 5_000,
        }
    }
}

impl PolicyConfig {
    /// Load `{data_dir}/policy.json`. Missing fields take their defaults.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/policy.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PolicyConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the deployment's `PRIOR_DAY_FREEZE` / `TODAY_2L_CLOSE` overrides.
    /// Malformed values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(t) = env_time("PRIOR_DAY_FREEZE") {
            self.prior_day_freeze = t;
            self.late_restricted_from = t;
        }
        if let Some(t) = env_time("TODAY_2L_CLOSE") {
            self.late_close = t;
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.late_close < self.late_restricted_from {
            anyhow::bail!(
                "late_close {} is before late_restricted_from {}",
                self.late_close.format("%H:%M"),
                self.late_restricted_from.format("%H:%M"),
            );
        }
        Ok(())
    }

    /// The configuration the test suite is written against.
    pub fn default_test() -> Self {
        Self::default()
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

fn env_time(key: &str) -> Option<NaiveTime> {
    let raw = std::env::var(key).ok()?;
    match hhmm::parse(&raw) {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("config: ignoring {key}={raw}: {e}");
            None
        }
    }
}

/// "HH:MM" (seconds optional) for cutoff times.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
    }

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
