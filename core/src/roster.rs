//! Read-only views for the kiosk grid, the wallboard and the admin screens.
//!
//! These read outside the slot lock and may be slightly stale. They never
//! feed an allocation decision.

use crate::{
    engine::{occupant_standing, AllocationEngine},
    error::{OvertimeError, OvertimeResult},
    event::BumpEventRecord,
    priority,
    store::{EmployeeRecord, OccupantRecord, SlotRecord, WeekRecord},
    types::{ClockNumber, SlotCode, SlotId, WeekendPart},
    weekend,
    window::{self, WindowState},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Per-slot allocation state. Re-evaluated on every read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Available,
    FullContestable,
    FullLocked,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonView {
    pub clock_number: ClockNumber,
    pub name: String,
    pub part: Option<WeekendPart>,
    pub is_second_late: bool,
}

impl From<&OccupantRecord> for PersonView {
    fn from(o: &OccupantRecord) -> Self {
        Self {
            clock_number: o.employee.clock_number.clone(),
            name: o.employee.name.clone(),
            part: o.part,
            is_second_late: o.is_second_late(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub slot_id: SlotId,
    pub date: NaiveDate,
    pub code: SlotCode,
    pub area: String,
    pub label: String,
    pub capacity: u32,
    pub taken: u32,
    pub categories: Vec<String>,
    pub people: Vec<PersonView>,
    pub window: WindowState,
    pub state: SlotState,
    pub disabled: bool,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub weekday: String,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekGrid {
    pub week: Option<WeekRecord>,
    pub days: Vec<DayView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallboardEntry {
    pub slot_id: SlotId,
    pub date: NaiveDate,
    pub code: SlotCode,
    pub label: String,
    pub capacity: u32,
    pub winners: Vec<PersonView>,
}

impl AllocationEngine {
    /// One week of the kiosk grid, Monday first.
    pub fn week_grid(&self, week_start: NaiveDate) -> OvertimeResult<WeekGrid> {
        let now = self.clock.now();
        let week = self.store.week_by_start(week_start)?;
        let slots = self.store.slots_between(week_start, week_start + Duration::days(6))?;

        let mut days: Vec<DayView> = Vec::with_capacity(7);
        for slot in slots {
            let view = self.slot_view(&slot, now)?;
            match days.last_mut() {
                Some(day) if day.date == slot.date => day.slots.push(view),
                _ => days.push(DayView {
                    date: slot.date,
                    weekday: slot.date.format("%A").to_string(),
                    slots: vec![view],
                }),
            }
        }
        Ok(WeekGrid { week, days })
    }

    /// Current state of one slot as a kiosk would see it.
    pub fn slot_state(&self, slot_id: SlotId) -> OvertimeResult<SlotState> {
        let slot = self
            .store
            .slot(slot_id)?
            .ok_or(OvertimeError::SlotNotFound { slot_id })?;
        let occupants = self.store.occupants(slot_id)?;
        let window = window::classify(slot.date, slot.code, slot.week_status, self.clock.now(), &self.config);
        Ok(self.evaluate(&slot, &occupants, window))
    }

    /// Winners per slot: weekday occupants in arrival order, weekend
    /// positions resolved by part.
    pub fn wallboard(&self, week_start: NaiveDate) -> OvertimeResult<Vec<WallboardEntry>> {
        let slots = self.store.slots_between(week_start, week_start + Duration::days(6))?;
        slots
            .into_iter()
            .map(|slot| {
                let occupants = self.store.occupants(slot.id)?;
                let winners = match slot.code {
                    SlotCode::Weekend => weekend::winners(&occupants)
                        .into_iter()
                        .map(PersonView::from)
                        .collect(),
                    _ => occupants.iter().map(PersonView::from).collect(),
                };
                Ok(WallboardEntry {
                    slot_id: slot.id,
                    date: slot.date,
                    code: slot.code,
                    label: slot_label(&slot),
                    capacity: slot.capacity,
                    winners,
                })
            })
            .collect()
    }

    /// Every employee, by clock number.
    pub fn roster(&self) -> OvertimeResult<Vec<EmployeeRecord>> {
        self.store.all_employees()
    }

    /// Bump history of one slot, oldest first.
    pub fn bump_log(&self, slot_id: SlotId) -> OvertimeResult<Vec<BumpEventRecord>> {
        self.store.bump_events_for_slot(slot_id)
    }

    fn slot_view(&self, slot: &SlotRecord, now: NaiveDateTime) -> OvertimeResult<SlotView> {
        let occupants = self.store.occupants(slot.id)?;
        let window = window::classify(slot.date, slot.code, slot.week_status, now, &self.config);
        let state = self.evaluate(slot, &occupants, window);
        Ok(SlotView {
            slot_id: slot.id,
            date: slot.date,
            code: slot.code,
            area: slot.area.clone(),
            label: slot_label(slot),
            capacity: slot.capacity,
            taken: occupants.len() as u32,
            categories: slot.required.iter().map(|c| c.as_str().to_string()).collect(),
            people: occupants.iter().map(PersonView::from).collect(),
            window,
            state,
            disabled: matches!(state, SlotState::Closed | SlotState::FullLocked),
            hint: window::hint(slot.code, window, slot.week_status).to_string(),
        })
    }

    fn evaluate(&self, slot: &SlotRecord, occupants: &[OccupantRecord], window: WindowState) -> SlotState {
        if !window.accepts_signups() {
            return SlotState::Closed;
        }
        if slot.capacity == 0 {
            return SlotState::FullLocked;
        }

        let shift_priority = self.config.shift_priority;
        let standing = |o: &OccupantRecord| occupant_standing(o, slot, &self.config);
        let contestable = |pool: &[OccupantRecord]| {
            priority::weakest(pool, &standing, shift_priority)
                .map(|i| priority::is_contestable(&standing(&pool[i]), shift_priority))
                .unwrap_or(false)
        };

        let taken = occupants.len() as u32;
        if slot.code == SlotCode::Weekend {
            if taken < slot.capacity {
                return SlotState::Available;
            }
            let partial_only = occupants.iter().all(|o| o.part.map(|p| p.is_partial()).unwrap_or(false));
            // A full-day claim can always override a slot of partial claims.
            return if partial_only || (taken == slot.capacity && contestable(occupants)) {
                SlotState::FullContestable
            } else {
                SlotState::FullLocked
            };
        }

        if taken < slot.capacity {
            return SlotState::Available;
        }
        if taken > slot.capacity {
            return SlotState::FullLocked;
        }

        let open_to_bump = if window == WindowState::BumpRestricted {
            occupants.iter().any(|o| o.is_second_late())
        } else {
            contestable(occupants)
        };
        if open_to_bump {
            SlotState::FullContestable
        } else {
            SlotState::FullLocked
        }
    }
}

fn slot_label(slot: &SlotRecord) -> String {
    if slot.area.is_empty() {
        slot.code.label().to_string()
    } else {
        format!("{} ({})", slot.code.label(), slot.area)
    }
}
