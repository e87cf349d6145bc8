use super::{employee::EmployeeRecord, fmt_date, fmt_ts, parse_text, parse_ts, SlotStore};
use crate::{
    error::OvertimeResult,
    event::BumpEventRecord,
    types::{EmployeeId, ShiftType, SignupId, SlotId, WeekendPart},
    weekend::PartClaim,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// A live signup together with the occupant's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupantRecord {
    pub signup_id: SignupId,
    pub slot_id: SlotId,
    pub employee: EmployeeRecord,
    pub part: Option<WeekendPart>,
    pub created_at: NaiveDateTime,
    /// 1-based position of this signup among the employee's late (`2L`)
    /// signups on the slot's date, by creation order. 0 for other codes.
    pub late_ordinal: u32,
}

impl OccupantRecord {
    /// This is the employee's second-or-later late claim of the day.
    pub fn is_second_late(&self) -> bool {
        self.late_ordinal >= 2
    }
}

impl PartClaim for OccupantRecord {
    fn signup_id(&self) -> SignupId {
        self.signup_id
    }

    fn part(&self) -> Option<WeekendPart> {
        self.part
    }

    fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }
}

/// Per-(employee, date) signup counts by slot class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounts {
    pub early: u32,
    pub late: u32,
}

impl SlotStore {
    /// Occupants of a slot in FIFO order (creation time, then id).
    pub fn occupants(&self, slot_id: SlotId) -> OvertimeResult<Vec<OccupantRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT x.id, x.slot_id, x.part, x.created_at,
                    e.id, e.clock_number, e.name, e.phone, e.shift_type, e.seniority_rank,
                    CASE WHEN s.slot_code = '2L' THEN (
                        SELECT COUNT(*) FROM signup x2
                        JOIN slot s2 ON s2.id = x2.slot_id
                        WHERE x2.employee_id = x.employee_id
                          AND s2.slot_date = s.slot_date
                          AND s2.slot_code = '2L'
                          AND (x2.created_at < x.created_at
                               OR (x2.created_at = x.created_at AND x2.id <= x.id))
                    ) ELSE 0 END AS late_ordinal
             FROM signup x
             JOIN employee e ON e.id = x.employee_id
             JOIN slot s ON s.id = x.slot_id
             WHERE x.slot_id = ?1
             ORDER BY x.created_at ASC, x.id ASC",
        )?;
        let rows = stmt
            .query_map(params![slot_id], |row| {
                let part: Option<String> = row.get(2)?;
                let created: String = row.get(3)?;
                let clock: String = row.get(5)?;
                let shift: String = row.get(8)?;
                Ok(OccupantRecord {
                    signup_id: row.get(0)?,
                    slot_id: row.get(1)?,
                    part: part.map(|p| parse_text(2, &p)).transpose()?,
                    created_at: parse_ts(3, &created)?,
                    employee: EmployeeRecord {
                        id: row.get(4)?,
                        clock_number: parse_text(5, &clock)?,
                        name: row.get(6)?,
                        phone: row.get(7)?,
                        categories: Default::default(),
                        shift_type: parse_text::<ShiftType>(8, &shift)?,
                        seniority_rank: row.get::<_, Option<i64>>(9)?.map(|r| r.max(0) as u32),
                    },
                    late_ordinal: row.get::<_, i64>(10)?.max(0) as u32,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|mut o| {
                o.employee.categories = self.employee_categories(o.employee.id)?;
                Ok(o)
            })
            .collect()
    }

    pub fn signup_for(
        &self,
        employee_id: EmployeeId,
        slot_id: SlotId,
    ) -> OvertimeResult<Option<SignupId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM signup WHERE employee_id = ?1 AND slot_id = ?2",
                params![employee_id, slot_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn day_counts(&self, employee_id: EmployeeId, date: NaiveDate) -> OvertimeResult<DayCounts> {
        let (early, late): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(CASE WHEN s.slot_code = '2E' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN s.slot_code = '2L' THEN 1 ELSE 0 END), 0)
             FROM signup x JOIN slot s ON s.id = x.slot_id
             WHERE x.employee_id = ?1 AND s.slot_date = ?2",
            params![employee_id, fmt_date(&date)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DayCounts {
            early: early.max(0) as u32,
            late: late.max(0) as u32,
        })
    }

    pub fn slot_taken(&self, slot_id: SlotId) -> OvertimeResult<u32> {
        let taken: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM signup WHERE slot_id = ?1",
            params![slot_id],
            |row| row.get(0),
        )?;
        Ok(taken.max(0) as u32)
    }

    pub fn insert_signup(
        &self,
        slot_id: SlotId,
        employee_id: EmployeeId,
        part: Option<WeekendPart>,
        created_at: NaiveDateTime,
    ) -> OvertimeResult<SignupId> {
        self.conn.execute(
            "INSERT INTO signup (slot_id, employee_id, part, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![slot_id, employee_id, part.map(|p| p.as_str()), fmt_ts(&created_at)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_signup(&self, signup_id: SignupId) -> OvertimeResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM signup WHERE id = ?1", params![signup_id])?;
        Ok(removed)
    }

    // ── Bump audit ─────────────────────────────────────────────

    pub fn append_bump_event(&self, record: &BumpEventRecord) -> OvertimeResult<i64> {
        self.conn.execute(
            "INSERT INTO bump_event (slot_id, winner_clock, displaced_clock, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.slot_id,
                record.winner.as_str(),
                record.displaced.as_str(),
                record.reason.as_str(),
                fmt_ts(&record.created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn bump_events_for_slot(&self, slot_id: SlotId) -> OvertimeResult<Vec<BumpEventRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, slot_id, winner_clock, displaced_clock, reason, created_at
             FROM bump_event WHERE slot_id = ?1
             ORDER BY id ASC",
        )?;
        let events = stmt
            .query_map(params![slot_id], |row| {
                let winner: String = row.get(2)?;
                let displaced: String = row.get(3)?;
                let reason: String = row.get(4)?;
                let created: String = row.get(5)?;
                Ok(BumpEventRecord {
                    id: Some(row.get(0)?),
                    slot_id: row.get(1)?,
                    winner: parse_text(2, &winner)?,
                    displaced: parse_text(3, &displaced)?,
                    reason: parse_text(4, &reason)?,
                    created_at: parse_ts(5, &created)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    pub fn bump_event_count(&self) -> OvertimeResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM bump_event", [], |row| row.get(0))?;
        Ok(count)
    }
}
