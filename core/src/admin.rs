//! Administrative operations: capacity, categories, employees and weeks.
//!
//! RULE: each operation is one write-locked unit; its change event is
//! published only after the unit commits.

use crate::{
    engine::AllocationEngine,
    error::{OvertimeError, OvertimeResult},
    event::ChangeEvent,
    store::{EmployeeProfile, EmployeeRecord, SlotRecord, WeekRecord},
    types::{parse_categories, ClockNumber, SlotCode, SlotId, WeekStatus},
};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

impl AllocationEngine {
    // ── Slots ──────────────────────────────────────────────────

    /// Define an extra slot of `code` on `date`, told apart from the
    /// generated one by `area` (e.g. a line or department). Repeating the
    /// call returns the same slot with the new capacity. The slot joins the
    /// week containing `date` when that week exists.
    pub fn add_slot(
        &mut self,
        date: NaiveDate,
        code: SlotCode,
        area: &str,
        capacity: u32,
    ) -> OvertimeResult<SlotRecord> {
        if !codes_for(date.weekday()).contains(&code) {
            return Err(OvertimeError::InvalidSlotCode {
                raw: format!("{code} on {}", date.format("%A")),
            });
        }

        let slot = self.store.with_write_lock(|s| {
            let week_id = s.week_by_start(week_start_of(date))?.map(|w| w.id);
            let slot_id = s.ensure_slot(week_id, date, code, area)?;
            s.set_capacity(slot_id, capacity)?;
            s.slot(slot_id)?.ok_or(OvertimeError::SlotNotFound { slot_id })
        })?;

        log::info!(
            "slot={} date={date} code={code} area='{}' capacity={capacity} defined",
            slot.id,
            slot.area
        );
        self.publish(&[ChangeEvent::SlotAdded {
            slot_id: slot.id,
            date,
            code,
            area: slot.area.clone(),
        }]);
        Ok(slot)
    }

    /// Capacity changes never evict existing occupants.
    pub fn set_slot_capacity(&mut self, slot_id: SlotId, capacity: u32) -> OvertimeResult<()> {
        self.store.with_slot_lock(slot_id, |s| {
            if s.set_capacity(slot_id, capacity)? == 0 {
                return Err(OvertimeError::SlotNotFound { slot_id });
            }
            Ok(())
        })?;
        log::info!("slot={slot_id} capacity={capacity}");
        self.publish(&[ChangeEvent::CapacityChanged { slot_id, capacity }]);
        Ok(())
    }

    pub fn set_slot_categories<S: AsRef<str>>(
        &mut self,
        slot_id: SlotId,
        categories: &[S],
    ) -> OvertimeResult<()> {
        let parsed = parse_categories(categories)?;
        self.store.with_slot_lock(slot_id, |s| {
            if s.slot(slot_id)?.is_none() {
                return Err(OvertimeError::SlotNotFound { slot_id });
            }
            s.replace_slot_categories(slot_id, &parsed)
        })?;

        let names: Vec<String> = parsed.iter().map(|c| c.as_str().to_string()).collect();
        log::info!("slot={slot_id} categories=[{}]", names.join(", "));
        self.publish(&[ChangeEvent::CategoriesChanged { slot_id, categories: names }]);
        Ok(())
    }

    /// Remove one employee's signup from a slot. This is a vacancy, not a
    /// bump: no audit row is written. Returns whether anything was removed.
    pub fn vacate_signup(&mut self, slot_id: SlotId, clock_number: &str) -> OvertimeResult<bool> {
        let clock = ClockNumber::parse(clock_number)?;
        let removed = self.store.with_slot_lock(slot_id, |s| {
            let employee = s
                .find_employee(&clock)?
                .ok_or_else(|| OvertimeError::EmployeeNotFound { clock_number: clock.to_string() })?;
            match s.signup_for(employee.id, slot_id)? {
                Some(signup_id) => Ok(s.delete_signup(signup_id)? > 0),
                None => Ok(false),
            }
        })?;

        if removed {
            log::info!("slot={slot_id} clock={clock} vacated");
            self.publish(&[ChangeEvent::SignupVacated { slot_id, clock_number: clock }]);
        }
        Ok(removed)
    }

    // ── Employees ──────────────────────────────────────────────

    pub fn create_employee(
        &mut self,
        clock_number: &str,
        profile: &EmployeeProfile,
    ) -> OvertimeResult<EmployeeRecord> {
        let clock = ClockNumber::parse(clock_number)?;
        let created = self.store.with_write_lock(|s| {
            let id = s.insert_employee(&clock, profile)?;
            s.employee_by_id(id)?
                .ok_or_else(|| OvertimeError::EmployeeNotFound { clock_number: clock.to_string() })
        });

        let created = match created {
            Ok(e) => e,
            Err(e) => {
                if e.is_integrity_violation() {
                    log::warn!("clock={clock} create refused: {e}");
                }
                return Err(e);
            }
        };
        log::info!("clock={clock} employee created");
        self.publish(&[ChangeEvent::EmployeeCreated { clock_number: clock }]);
        Ok(created)
    }

    /// Replace the mutable profile. The clock number never changes.
    pub fn update_employee(
        &mut self,
        clock_number: &str,
        profile: &EmployeeProfile,
    ) -> OvertimeResult<EmployeeRecord> {
        let clock = ClockNumber::parse(clock_number)?;
        let updated = self.store.with_write_lock(|s| {
            let existing = s
                .find_employee(&clock)?
                .ok_or_else(|| OvertimeError::EmployeeNotFound { clock_number: clock.to_string() })?;
            s.update_employee(existing.id, profile)?;
            s.employee_by_id(existing.id)?
                .ok_or_else(|| OvertimeError::EmployeeNotFound { clock_number: clock.to_string() })
        })?;

        log::info!("clock={clock} employee updated");
        self.publish(&[ChangeEvent::EmployeeUpdated { clock_number: clock }]);
        Ok(updated)
    }

    /// Refused while the employee holds any signup; vacate those first.
    pub fn delete_employee(&mut self, clock_number: &str) -> OvertimeResult<()> {
        let clock = ClockNumber::parse(clock_number)?;
        let deleted = self.store.with_write_lock(|s| {
            let existing = s
                .find_employee(&clock)?
                .ok_or_else(|| OvertimeError::EmployeeNotFound { clock_number: clock.to_string() })?;
            let signups = s.employee_signup_count(existing.id)?;
            if signups > 0 {
                return Err(OvertimeError::EmployeeHasSignups {
                    clock_number: clock.to_string(),
                    signups,
                });
            }
            s.delete_employee(existing.id)
        });

        if let Err(e) = deleted {
            log::warn!("clock={clock} delete refused: {e}");
            return Err(e);
        }
        log::info!("clock={clock} employee deleted");
        self.publish(&[ChangeEvent::EmployeeDeleted { clock_number: clock }]);
        Ok(())
    }

    // ── Weeks ──────────────────────────────────────────────────

    /// Create the week starting on `start` (a Monday) with its slots:
    /// `2E` and `2L` Monday to Friday, `WKND` on Saturday and Sunday.
    /// Every generated slot starts at capacity 0.
    pub fn create_week(&mut self, start: NaiveDate) -> OvertimeResult<WeekRecord> {
        if start.weekday() != Weekday::Mon {
            return Err(OvertimeError::InvalidWeekStart { date: start });
        }
        let end = start + Duration::days(6);
        let status = self.config.default_week_status;

        let week = self.store.with_write_lock(|s| {
            let week_id = s.insert_week(start, end, status)?;
            for offset in 0..7 {
                let date = start + Duration::days(offset);
                for code in codes_for(date.weekday()) {
                    s.ensure_slot(Some(week_id), date, *code, "")?;
                }
            }
            s.week(week_id)?.ok_or(OvertimeError::WeekNotFound { week_id })
        })?;

        log::info!("week={} start={start} status={} created", week.id, week.status.as_str());
        self.publish(&[ChangeEvent::WeekCreated { week_id: week.id, start_date: start }]);
        Ok(week)
    }

    /// The week containing `date`, creating it if it does not exist yet.
    pub fn ensure_week_for(&mut self, date: NaiveDate) -> OvertimeResult<WeekRecord> {
        let monday = week_start_of(date);
        if let Some(existing) = self.store.week_by_start(monday)? {
            return Ok(existing);
        }
        match self.create_week(monday) {
            Ok(week) => Ok(week),
            // Another kiosk created it between our read and our write.
            Err(OvertimeError::DuplicateWeek { .. }) => self
                .store
                .week_by_start(monday)?
                .ok_or(OvertimeError::Other(anyhow::anyhow!("week {monday} vanished"))),
            Err(e) => Err(e),
        }
    }

    /// Lifecycle moves forward only. Setting the current status is a no-op.
    pub fn set_week_status(&mut self, week_id: i64, status: WeekStatus) -> OvertimeResult<WeekRecord> {
        let (week, changed) = self.store.with_write_lock(|s| {
            let week = s.week(week_id)?.ok_or(OvertimeError::WeekNotFound { week_id })?;
            if week.status == status {
                return Ok((week, false));
            }
            if !week.status.can_become(status) {
                return Err(OvertimeError::InvalidWeekTransition {
                    week_id,
                    from: week.status.as_str().to_string(),
                    to: status.as_str().to_string(),
                });
            }
            s.set_week_status(week_id, status)?;
            Ok((WeekRecord { status, ..week }, true))
        })?;

        if changed {
            log::info!("week={week_id} status={}", status.as_str());
            self.publish(&[ChangeEvent::WeekStatusChanged { week_id, status }]);
        }
        Ok(week)
    }
}

/// Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn codes_for(day: Weekday) -> &'static [SlotCode] {
    match day {
        Weekday::Sat | Weekday::Sun => &[SlotCode::Weekend],
        _ => &[SlotCode::Early, SlotCode::Late],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_start_is_the_monday_on_or_before() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert_eq!(week_start_of(monday), monday);
        assert_eq!(week_start_of(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()), monday);
        assert_eq!(week_start_of(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()), monday);
    }

    #[test]
    fn weekdays_get_early_and_late_weekends_get_one_slot() {
        assert_eq!(codes_for(Weekday::Wed), &[SlotCode::Early, SlotCode::Late]);
        assert_eq!(codes_for(Weekday::Sun), &[SlotCode::Weekend]);
    }
}
