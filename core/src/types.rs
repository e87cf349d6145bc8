//! Shared primitive and domain types used across the engine.
//!
//! Everything that arrives as a loose string at the kiosk boundary
//! (clock numbers, categories, slot codes, parts) is parsed into one of
//! these closed types before it reaches a decision.

use crate::error::{OvertimeError, OvertimeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Row id of a slot.
pub type SlotId = i64;

/// Row id of an employee.
pub type EmployeeId = i64;

/// Row id of a signup.
pub type SignupId = i64;

/// Row id of a week.
pub type WeekId = i64;

// ── Clock number ───────────────────────────────────────────────

/// The human-facing employee key: exactly four ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockNumber(String);

impl ClockNumber {
    pub fn parse(raw: &str) -> OvertimeResult<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(OvertimeError::InvalidClockNumber { raw: raw.to_string() })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value; lower numbers were issued earlier.
    pub fn value(&self) -> u16 {
        self.0.bytes().fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'))
    }
}

impl fmt::Display for ClockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClockNumber {
    type Err = OvertimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClockNumber {
    type Error = OvertimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClockNumber> for String {
    fn from(value: ClockNumber) -> Self {
        value.0
    }
}

// ── Skill categories ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Electrical,
    Mechanical,
    Programming,
    #[serde(rename = "Mobile Equipment")]
    MobileEquipment,
    Batch,
    Inspection,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Electrical,
        Category::Mechanical,
        Category::Programming,
        Category::MobileEquipment,
        Category::Batch,
        Category::Inspection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical      => "Electrical",
            Self::Mechanical      => "Mechanical",
            Self::Programming     => "Programming",
            Self::MobileEquipment => "Mobile Equipment",
            Self::Batch           => "Batch",
            Self::Inspection      => "Inspection",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = OvertimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OvertimeError::UnknownCategory { raw: s.to_string() })
    }
}

pub type CategorySet = BTreeSet<Category>;

/// Parse a list of loose category names, rejecting any unknown entry.
pub fn parse_categories<S: AsRef<str>>(raw: &[S]) -> OvertimeResult<CategorySet> {
    raw.iter()
        .filter(|s| !s.as_ref().trim().is_empty())
        .map(|s| s.as_ref().parse())
        .collect()
}

/// True when `held` satisfies `required`. An empty requirement is open to anyone.
pub fn category_match(required: &CategorySet, held: &CategorySet) -> bool {
    required.is_empty() || !required.is_disjoint(held)
}

// ── Slot codes ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotCode {
    #[serde(rename = "2E")]
    Early,
    #[serde(rename = "2L")]
    Late,
    #[serde(rename = "WKND")]
    Weekend,
}

impl SlotCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Early   => "2E",
            Self::Late    => "2L",
            Self::Weekend => "WKND",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Early   => "2 Early",
            Self::Late    => "2 Late",
            Self::Weekend => "Weekend",
        }
    }

    /// Display order within a day.
    pub fn sort_index(&self) -> u8 {
        match self {
            Self::Early   => 0,
            Self::Late    => 1,
            Self::Weekend => 2,
        }
    }
}

impl fmt::Display for SlotCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotCode {
    type Err = OvertimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2E" => Ok(Self::Early),
            "2L" => Ok(Self::Late),
            "WKND" => Ok(Self::Weekend),
            other => Err(OvertimeError::InvalidSlotCode { raw: other.to_string() }),
        }
    }
}

// ── Weekend parts ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekendPart {
    First4,
    Full8,
    Last4,
}

impl WeekendPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First4 => "first4",
            Self::Full8  => "full8",
            Self::Last4  => "last4",
        }
    }

    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::Full8)
    }
}

impl FromStr for WeekendPart {
    type Err = OvertimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "first4" => Ok(Self::First4),
            "full8"  => Ok(Self::Full8),
            "last4"  => Ok(Self::Last4),
            _ => Err(OvertimeError::InvalidPart { detail: format!("unknown part '{s}'") }),
        }
    }
}

// ── Employees ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftType {
    #[default]
    Day,
    Rotating,
}

impl ShiftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day      => "day",
            Self::Rotating => "rotating",
        }
    }

    /// Higher wins when shift priority is enabled.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Day      => 2,
            Self::Rotating => 1,
        }
    }
}

impl FromStr for ShiftType {
    type Err = OvertimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "rotating" => Ok(Self::Rotating),
            other => Err(OvertimeError::Other(anyhow::anyhow!("unknown shift type '{other}'"))),
        }
    }
}

// ── Weeks ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStatus {
    Draft,
    Published,
    Closed,
}

impl WeekStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft     => "draft",
            Self::Published => "published",
            Self::Closed    => "closed",
        }
    }

    /// Lifecycle only moves forward.
    pub fn can_become(&self, next: WeekStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Published) | (Self::Draft, Self::Closed) | (Self::Published, Self::Closed)
        )
    }

    pub fn accepts_signups(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl FromStr for WeekStatus {
    type Err = OvertimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "closed" => Ok(Self::Closed),
            other => Err(OvertimeError::Other(anyhow::anyhow!("unknown week status '{other}'"))),
        }
    }
}

// ── Outcomes ───────────────────────────────────────────────────

/// Terminal status of one signup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupStatus {
    Success,
    Duplicate,
    Bumped,
    BumpedSecondLate,
    LimitEarly,
    LimitLate,
    Frozen,
    ClosedToday,
    Closed,
    FullNoBumpWindow,
    FullNoPriority,
    NotFound,
}

impl SignupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success          => "success",
            Self::Duplicate        => "duplicate",
            Self::Bumped           => "bumped",
            Self::BumpedSecondLate => "bumped_second_late",
            Self::LimitEarly       => "limit_early",
            Self::LimitLate        => "limit_late",
            Self::Frozen           => "frozen",
            Self::ClosedToday      => "closed_today",
            Self::Closed           => "closed",
            Self::FullNoBumpWindow => "full_no_bump_window",
            Self::FullNoPriority   => "full_no_priority",
            Self::NotFound         => "not_found",
        }
    }

    /// The caller now holds a signup on the slot.
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Success | Self::Duplicate | Self::Bumped | Self::BumpedSecondLate)
    }
}

impl fmt::Display for SignupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BumpReason {
    CategorySeniority,
    SecondShiftForfeiture,
    ShiftPriority,
    WeekendFull8Override,
}

impl BumpReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CategorySeniority     => "category_seniority",
            Self::SecondShiftForfeiture => "second_shift_forfeiture",
            Self::ShiftPriority         => "shift_priority",
            Self::WeekendFull8Override  => "weekend_full8_override",
        }
    }
}

impl FromStr for BumpReason {
    type Err = OvertimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category_seniority" => Ok(Self::CategorySeniority),
            "second_shift_forfeiture" => Ok(Self::SecondShiftForfeiture),
            "shift_priority" => Ok(Self::ShiftPriority),
            "weekend_full8_override" => Ok(Self::WeekendFull8Override),
            other => Err(OvertimeError::Other(anyhow::anyhow!("unknown bump reason '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_number_requires_four_digits() {
        assert!(ClockNumber::parse("0042").is_ok());
        assert!(ClockNumber::parse(" 1234 ").is_ok());
        assert!(ClockNumber::parse("123").is_err());
        assert!(ClockNumber::parse("12345").is_err());
        assert!(ClockNumber::parse("12a4").is_err());
        assert!(ClockNumber::parse("١٢٣٤").is_err());
        assert_eq!(ClockNumber::parse("0042").unwrap().value(), 42);
    }

    #[test]
    fn categories_parse_case_insensitively() {
        let set = parse_categories(&["electrical", " Mobile Equipment ", ""]).unwrap();
        assert!(set.contains(&Category::Electrical));
        assert!(set.contains(&Category::MobileEquipment));
        assert_eq!(set.len(), 2);
        assert!(parse_categories(&["Weld"]).is_err());
    }

    #[test]
    fn empty_requirement_matches_everyone() {
        let required = CategorySet::new();
        assert!(category_match(&required, &CategorySet::new()));

        let required: CategorySet = [Category::Batch].into();
        assert!(!category_match(&required, &[Category::Inspection].into()));
        assert!(category_match(&required, &[Category::Inspection, Category::Batch].into()));
    }

    #[test]
    fn week_lifecycle_only_moves_forward() {
        assert!(WeekStatus::Draft.can_become(WeekStatus::Published));
        assert!(WeekStatus::Published.can_become(WeekStatus::Closed));
        assert!(!WeekStatus::Closed.can_become(WeekStatus::Published));
        assert!(!WeekStatus::Published.can_become(WeekStatus::Draft));
    }

    #[test]
    fn weekend_part_accepts_legacy_labels() {
        assert_eq!("Full 8".parse::<WeekendPart>().unwrap(), WeekendPart::Full8);
        assert_eq!("first4".parse::<WeekendPart>().unwrap(), WeekendPart::First4);
        assert!("half".parse::<WeekendPart>().is_err());
    }
}
