use thiserror::Error;

#[derive(Error, Debug)]
pub enum OvertimeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Clock number must be exactly 4 digits, got '{raw}'")]
    InvalidClockNumber { raw: String },

    #[error("Unknown category '{raw}'")]
    UnknownCategory { raw: String },

    #[error("Unknown slot code '{raw}'")]
    InvalidSlotCode { raw: String },

    #[error("Invalid weekend part: {detail}")]
    InvalidPart { detail: String },

    #[error("Week must start on a Monday, got {date}")]
    InvalidWeekStart { date: chrono::NaiveDate },

    #[error("Slot {slot_id} not found")]
    SlotNotFound { slot_id: i64 },

    #[error("Employee {clock_number} not found")]
    EmployeeNotFound { clock_number: String },

    #[error("Week {week_id} not found")]
    WeekNotFound { week_id: i64 },

    #[error("Clock number {clock_number} already exists")]
    DuplicateClockNumber { clock_number: String },

    #[error("A week starting {start} already exists")]
    DuplicateWeek { start: chrono::NaiveDate },

    #[error("Cannot delete employee {clock_number}: {signups} signup(s) still held")]
    EmployeeHasSignups { clock_number: String, signups: i64 },

    #[error("Week {week_id} cannot move from {from} to {to}")]
    InvalidWeekTransition { week_id: i64, from: String, to: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OvertimeError {
    /// Store failures roll the whole attempt back; the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Serialization(_))
    }

    /// Integrity violations the caller can offer a corrective path for.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::DuplicateClockNumber { .. } | Self::DuplicateWeek { .. })
    }

    /// Stable category used on the kiosk wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::Serialization(_) => "transient",
            Self::InvalidClockNumber { .. }
            | Self::UnknownCategory { .. }
            | Self::InvalidSlotCode { .. }
            | Self::InvalidPart { .. }
            | Self::InvalidWeekStart { .. } => "validation",
            Self::SlotNotFound { .. } | Self::EmployeeNotFound { .. } | Self::WeekNotFound { .. } => {
                "not_found"
            }
            Self::DuplicateClockNumber { .. } | Self::DuplicateWeek { .. } => "integrity",
            Self::EmployeeHasSignups { .. } | Self::InvalidWeekTransition { .. } => "refused",
            Self::Other(_) => "internal",
        }
    }
}

pub type OvertimeResult<T> = Result<T, OvertimeError>;
