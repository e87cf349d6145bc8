use super::{fmt_date, is_unique_violation, parse_date, parse_text, SlotStore};
use crate::{
    error::{OvertimeError, OvertimeResult},
    types::{Category, CategorySet, SlotCode, SlotId, WeekId, WeekStatus},
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub id: SlotId,
    pub week_id: Option<WeekId>,
    pub date: NaiveDate,
    pub code: SlotCode,
    /// Distinguishes extra slots of the same code on one date; `""` for
    /// the generated slot.
    pub area: String,
    pub capacity: u32,
    pub required: CategorySet,
    /// Status of the owning week; `None` for a slot outside any week.
    pub week_status: Option<WeekStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRecord {
    pub id: WeekId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: WeekStatus,
}

const SLOT_SELECT: &str = "SELECT s.id, s.week_id, s.slot_date, s.slot_code, s.capacity, w.status, s.area
     FROM slot s LEFT JOIN week w ON w.id = s.week_id";

fn slot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SlotRecord> {
    let date: String = row.get(2)?;
    let code: String = row.get(3)?;
    let status: Option<String> = row.get(5)?;
    Ok(SlotRecord {
        id: row.get(0)?,
        week_id: row.get(1)?,
        date: parse_date(2, &date)?,
        code: parse_text(3, &code)?,
        area: row.get(6)?,
        capacity: row.get::<_, i64>(4)?.max(0) as u32,
        required: CategorySet::new(),
        week_status: status.map(|s| parse_text(5, &s)).transpose()?,
    })
}

fn week_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeekRecord> {
    let start: String = row.get(1)?;
    let end: String = row.get(2)?;
    let status: String = row.get(3)?;
    Ok(WeekRecord {
        id: row.get(0)?,
        start_date: parse_date(1, &start)?,
        end_date: parse_date(2, &end)?,
        status: parse_text(3, &status)?,
    })
}

impl SlotStore {
    // ── Weeks ──────────────────────────────────────────────────

    pub fn insert_week(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        status: WeekStatus,
    ) -> OvertimeResult<WeekId> {
        let inserted = self.conn.execute(
            "INSERT INTO week (start_date, end_date, status) VALUES (?1, ?2, ?3)",
            params![fmt_date(&start), fmt_date(&end), status.as_str()],
        );
        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => Err(OvertimeError::DuplicateWeek { start }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn week(&self, id: WeekId) -> OvertimeResult<Option<WeekRecord>> {
        let week = self
            .conn
            .query_row(
                "SELECT id, start_date, end_date, status FROM week WHERE id = ?1",
                params![id],
                week_from_row,
            )
            .optional()?;
        Ok(week)
    }

    pub fn week_by_start(&self, start: NaiveDate) -> OvertimeResult<Option<WeekRecord>> {
        let week = self
            .conn
            .query_row(
                "SELECT id, start_date, end_date, status FROM week WHERE start_date = ?1",
                params![fmt_date(&start)],
                week_from_row,
            )
            .optional()?;
        Ok(week)
    }

    pub fn set_week_status(&self, id: WeekId, status: WeekStatus) -> OvertimeResult<()> {
        self.conn.execute(
            "UPDATE week SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(())
    }

    // ── Slots ──────────────────────────────────────────────────

    /// Insert a slot, or return the existing one for (date, code, area).
    /// An orphan slot is adopted into `week_id`.
    pub fn ensure_slot(
        &self,
        week_id: Option<WeekId>,
        date: NaiveDate,
        code: SlotCode,
        area: &str,
    ) -> OvertimeResult<SlotId> {
        let area = area.trim();
        self.conn.execute(
            "INSERT OR IGNORE INTO slot (week_id, slot_date, slot_code, area, capacity)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![week_id, fmt_date(&date), code.as_str(), area],
        )?;
        let id: SlotId = self.conn.query_row(
            "SELECT id FROM slot WHERE slot_date = ?1 AND slot_code = ?2 AND area = ?3",
            params![fmt_date(&date), code.as_str(), area],
            |row| row.get(0),
        )?;
        if week_id.is_some() {
            self.conn.execute(
                "UPDATE slot SET week_id = ?1 WHERE id = ?2 AND week_id IS NULL",
                params![week_id, id],
            )?;
        }
        Ok(id)
    }

    pub fn slot(&self, id: SlotId) -> OvertimeResult<Option<SlotRecord>> {
        let sql = format!("{SLOT_SELECT} WHERE s.id = ?1");
        let found = self
            .conn
            .query_row(&sql, params![id], slot_from_row)
            .optional()?;
        match found {
            Some(mut slot) => {
                slot.required = self.slot_categories(slot.id)?;
                Ok(Some(slot))
            }
            None => Ok(None),
        }
    }

    /// Slots dated in `[from, to]`, by date, code, then area.
    pub fn slots_between(&self, from: NaiveDate, to: NaiveDate) -> OvertimeResult<Vec<SlotRecord>> {
        let sql = format!(
            "{SLOT_SELECT} WHERE s.slot_date BETWEEN ?1 AND ?2 ORDER BY s.slot_date, s.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut slots = stmt
            .query_map(params![fmt_date(&from), fmt_date(&to)], slot_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for slot in &mut slots {
            slot.required = self.slot_categories(slot.id)?;
        }
        slots.sort_by(|a, b| {
            (a.date, a.code.sort_index(), &a.area).cmp(&(b.date, b.code.sort_index(), &b.area))
        });
        Ok(slots)
    }

    pub fn set_capacity(&self, id: SlotId, capacity: u32) -> OvertimeResult<usize> {
        let changed = self.conn.execute(
            "UPDATE slot SET capacity = ?1 WHERE id = ?2",
            params![i64::from(capacity), id],
        )?;
        Ok(changed)
    }

    pub fn replace_slot_categories(&self, id: SlotId, categories: &CategorySet) -> OvertimeResult<()> {
        self.conn
            .execute("DELETE FROM slot_category WHERE slot_id = ?1", params![id])?;
        for c in categories {
            self.conn.execute(
                "INSERT OR IGNORE INTO slot_category (slot_id, category) VALUES (?1, ?2)",
                params![id, c.as_str()],
            )?;
        }
        Ok(())
    }

    pub fn slot_categories(&self, id: SlotId) -> OvertimeResult<CategorySet> {
        let mut stmt = self
            .conn
            .prepare("SELECT category FROM slot_category WHERE slot_id = ?1")?;
        let cats = stmt
            .query_map(params![id], |row| {
                let raw: String = row.get(0)?;
                parse_text::<Category>(0, &raw)
            })?
            .collect::<Result<CategorySet, _>>()?;
        Ok(cats)
    }
}
