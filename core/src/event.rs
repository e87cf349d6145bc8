//! Change events emitted after every committed mutation.
//!
//! RULE: events are built inside the slot lock but dispatched only after
//! commit. The presentation layer treats them as "refresh" hints.

use crate::types::{BumpReason, ClockNumber, SlotCode, SlotId, WeekId, WeekStatus, WeekendPart};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Every change the engine reports to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    // ── Signup activity ────────────────────────────
    SignupRecorded {
        slot_id: SlotId,
        clock_number: ClockNumber,
        part: Option<WeekendPart>,
    },
    SignupBumped {
        slot_id: SlotId,
        winner: ClockNumber,
        displaced: ClockNumber,
        reason: BumpReason,
    },
    SignupVacated {
        slot_id: SlotId,
        clock_number: ClockNumber,
    },

    // ── Admin activity ─────────────────────────────
    SlotAdded {
        slot_id: SlotId,
        date: NaiveDate,
        code: SlotCode,
        area: String,
    },
    CapacityChanged {
        slot_id: SlotId,
        capacity: u32,
    },
    CategoriesChanged {
        slot_id: SlotId,
        categories: Vec<String>,
    },
    EmployeeCreated {
        clock_number: ClockNumber,
    },
    EmployeeUpdated {
        clock_number: ClockNumber,
    },
    EmployeeDeleted {
        clock_number: ClockNumber,
    },
    WeekCreated {
        week_id: WeekId,
        start_date: NaiveDate,
    },
    WeekStatusChanged {
        week_id: WeekId,
        status: WeekStatus,
    },
}

impl ChangeEvent {
    /// Stable name, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SignupRecorded { .. }    => "signup_recorded",
            Self::SignupBumped { .. }      => "signup_bumped",
            Self::SignupVacated { .. }     => "signup_vacated",
            Self::SlotAdded { .. }         => "slot_added",
            Self::CapacityChanged { .. }   => "capacity_changed",
            Self::CategoriesChanged { .. } => "categories_changed",
            Self::EmployeeCreated { .. }   => "employee_created",
            Self::EmployeeUpdated { .. }   => "employee_updated",
            Self::EmployeeDeleted { .. }   => "employee_deleted",
            Self::WeekCreated { .. }       => "week_created",
            Self::WeekStatusChanged { .. } => "week_status_changed",
        }
    }

    pub fn slot_id(&self) -> Option<SlotId> {
        match self {
            Self::SignupRecorded { slot_id, .. }
            | Self::SignupBumped { slot_id, .. }
            | Self::SignupVacated { slot_id, .. }
            | Self::SlotAdded { slot_id, .. }
            | Self::CapacityChanged { slot_id, .. }
            | Self::CategoriesChanged { slot_id, .. } => Some(*slot_id),
            _ => None,
        }
    }
}

/// One row of the bump audit log as persisted to SQLite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BumpEventRecord {
    pub id: Option<i64>,
    pub slot_id: SlotId,
    pub winner: ClockNumber,
    pub displaced: ClockNumber,
    pub reason: BumpReason,
    pub created_at: NaiveDateTime,
}
