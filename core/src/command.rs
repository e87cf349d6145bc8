use crate::{
    engine::{AllocationEngine, SignupOutcome, SignupRequest},
    error::OvertimeError,
    event::BumpEventRecord,
    roster::{SlotState, WallboardEntry, WeekGrid},
    store::{EmployeeProfile, EmployeeRecord, SlotRecord, WeekRecord},
    types::{SlotCode, SlotId, WeekId, WeekStatus},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every request a kiosk or admin screen can make.
/// Variants are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum KioskCommand {
    // ── Kiosk ─────────────────────────────────────
    Signup(SignupRequest),
    WeekGrid { week_start: NaiveDate },
    Wallboard { week_start: NaiveDate },
    SlotState { slot_id: SlotId },

    // ── Admin: slots ──────────────────────────────
    AddSlot {
        date:     NaiveDate,
        code:     SlotCode,
        #[serde(default)]
        area:     String,
        capacity: u32,
    },
    SetCapacity {
        slot_id:  SlotId,
        capacity: u32,
    },
    SetCategories {
        slot_id:    SlotId,
        categories: Vec<String>,
    },
    Vacate {
        slot_id:      SlotId,
        clock_number: String,
    },
    BumpLog { slot_id: SlotId },

    // ── Admin: employees ──────────────────────────
    CreateEmployee {
        clock_number: String,
        profile:      EmployeeProfile,
    },
    UpdateEmployee {
        clock_number: String,
        profile:      EmployeeProfile,
    },
    DeleteEmployee { clock_number: String },
    Roster,

    // ── Admin: weeks ──────────────────────────────
    CreateWeek { start: NaiveDate },
    EnsureWeek { date: NaiveDate },
    SetWeekStatus {
        week_id: WeekId,
        status:  WeekStatus,
    },
}

/// One reply per command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandReply {
    Signup(SignupOutcome),
    Grid(WeekGrid),
    Wallboard { entries: Vec<WallboardEntry> },
    SlotState { slot_id: SlotId, state: SlotState },
    Slot(SlotRecord),
    Ok,
    Vacated { removed: bool },
    BumpLog { events: Vec<BumpEventRecord> },
    Employee(EmployeeRecord),
    Roster { employees: Vec<EmployeeRecord> },
    Week(WeekRecord),
    Error { kind: String, message: String },
}

impl CommandReply {
    pub fn from_error(e: &OvertimeError) -> Self {
        Self::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl AllocationEngine {
    /// Run one command. Failures become an `error` reply; they never
    /// escape as a panic or leave partial state behind.
    pub fn execute(&mut self, command: KioskCommand) -> CommandReply {
        match self.dispatch(command) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("command failed ({}): {e}", e.kind());
                CommandReply::from_error(&e)
            }
        }
    }

    fn dispatch(&mut self, command: KioskCommand) -> Result<CommandReply, OvertimeError> {
        let reply = match command {
            KioskCommand::Signup(request) => CommandReply::Signup(self.signup(&request)?),
            KioskCommand::WeekGrid { week_start } => CommandReply::Grid(self.week_grid(week_start)?),
            KioskCommand::Wallboard { week_start } => CommandReply::Wallboard {
                entries: self.wallboard(week_start)?,
            },
            KioskCommand::SlotState { slot_id } => CommandReply::SlotState {
                slot_id,
                state: self.slot_state(slot_id)?,
            },
            KioskCommand::AddSlot { date, code, area, capacity } => {
                CommandReply::Slot(self.add_slot(date, code, &area, capacity)?)
            }
            KioskCommand::SetCapacity { slot_id, capacity } => {
                self.set_slot_capacity(slot_id, capacity)?;
                CommandReply::Ok
            }
            KioskCommand::SetCategories { slot_id, categories } => {
                self.set_slot_categories(slot_id, &categories)?;
                CommandReply::Ok
            }
            KioskCommand::Vacate { slot_id, clock_number } => CommandReply::Vacated {
                removed: self.vacate_signup(slot_id, &clock_number)?,
            },
            KioskCommand::BumpLog { slot_id } => CommandReply::BumpLog {
                events: self.bump_log(slot_id)?,
            },
            KioskCommand::CreateEmployee { clock_number, profile } => {
                CommandReply::Employee(self.create_employee(&clock_number, &profile)?)
            }
            KioskCommand::UpdateEmployee { clock_number, profile } => {
                CommandReply::Employee(self.update_employee(&clock_number, &profile)?)
            }
            KioskCommand::DeleteEmployee { clock_number } => {
                self.delete_employee(&clock_number)?;
                CommandReply::Ok
            }
            KioskCommand::Roster => CommandReply::Roster { employees: self.roster()? },
            KioskCommand::CreateWeek { start } => CommandReply::Week(self.create_week(start)?),
            KioskCommand::EnsureWeek { date } => CommandReply::Week(self.ensure_week_for(date)?),
            KioskCommand::SetWeekStatus { week_id, status } => {
                CommandReply::Week(self.set_week_status(week_id, status)?)
            }
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_command_parses_from_kiosk_json() {
        let cmd: KioskCommand = serde_json::from_str(
            r#"{"cmd":"signup","clock_number":"0420","name":"Robin","slot_id":7,"part":"full8"}"#,
        )
        .unwrap();
        match cmd {
            KioskCommand::Signup(req) => {
                assert_eq!(req.clock_number, "0420");
                assert_eq!(req.slot_id, 7);
                assert_eq!(req.part, Some(crate::types::WeekendPart::Full8));
                assert_eq!(req.phone, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn error_reply_carries_kind() {
        let reply = CommandReply::from_error(&OvertimeError::InvalidClockNumber { raw: "12".into() });
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "validation");
    }
}
