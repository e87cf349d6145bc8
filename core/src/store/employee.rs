use super::{is_unique_violation, parse_text, SlotStore};
use crate::{
    error::{OvertimeError, OvertimeResult},
    types::{Category, CategorySet, ClockNumber, EmployeeId, ShiftType},
};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub clock_number: ClockNumber,
    pub name: String,
    pub phone: Option<String>,
    pub categories: CategorySet,
    pub shift_type: ShiftType,
    pub seniority_rank: Option<u32>,
}

/// The mutable part of an employee. The clock number is set once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub categories: CategorySet,
    #[serde(default)]
    pub shift_type: ShiftType,
    #[serde(default)]
    pub seniority_rank: Option<u32>,
}

const EMPLOYEE_COLUMNS: &str = "id, clock_number, name, phone, shift_type, seniority_rank";

fn employee_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmployeeRecord> {
    let clock: String = row.get(1)?;
    let shift: String = row.get(4)?;
    Ok(EmployeeRecord {
        id: row.get(0)?,
        clock_number: parse_text(1, &clock)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        categories: CategorySet::new(),
        shift_type: parse_text(4, &shift)?,
        seniority_rank: row.get::<_, Option<i64>>(5)?.map(|r| r.max(0) as u32),
    })
}

impl SlotStore {
    pub fn find_employee(&self, clock: &ClockNumber) -> OvertimeResult<Option<EmployeeRecord>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employee WHERE clock_number = ?1");
        let found = self
            .conn
            .query_row(&sql, params![clock.as_str()], employee_from_row)
            .optional()?;
        self.with_categories(found)
    }

    pub fn employee_by_id(&self, id: EmployeeId) -> OvertimeResult<Option<EmployeeRecord>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employee WHERE id = ?1");
        let found = self
            .conn
            .query_row(&sql, params![id], employee_from_row)
            .optional()?;
        self.with_categories(found)
    }

    pub fn all_employees(&self) -> OvertimeResult<Vec<EmployeeRecord>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employee ORDER BY clock_number ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], employee_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|mut e| {
                e.categories = self.employee_categories(e.id)?;
                Ok(e)
            })
            .collect()
    }

    pub fn insert_employee(
        &self,
        clock: &ClockNumber,
        profile: &EmployeeProfile,
    ) -> OvertimeResult<EmployeeId> {
        let inserted = self.conn.execute(
            "INSERT INTO employee (clock_number, name, phone, shift_type, seniority_rank)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                clock.as_str(),
                profile.name.trim(),
                blank_to_none(profile.phone.as_deref()),
                profile.shift_type.as_str(),
                profile.seniority_rank.map(i64::from),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(OvertimeError::DuplicateClockNumber {
                    clock_number: clock.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
        let id = self.conn.last_insert_rowid();
        self.replace_employee_categories(id, &profile.categories)?;
        Ok(id)
    }

    pub fn update_employee(&self, id: EmployeeId, profile: &EmployeeProfile) -> OvertimeResult<()> {
        self.conn.execute(
            "UPDATE employee SET name = ?1, phone = ?2, shift_type = ?3, seniority_rank = ?4
             WHERE id = ?5",
            params![
                profile.name.trim(),
                blank_to_none(profile.phone.as_deref()),
                profile.shift_type.as_str(),
                profile.seniority_rank.map(i64::from),
                id,
            ],
        )?;
        self.replace_employee_categories(id, &profile.categories)
    }

    /// Fill name/phone only where the stored value is blank.
    pub fn fill_blank_contact(
        &self,
        id: EmployeeId,
        name: &str,
        phone: Option<&str>,
    ) -> OvertimeResult<bool> {
        let mut changed = 0;
        let name = name.trim();
        if !name.is_empty() {
            changed += self.conn.execute(
                "UPDATE employee SET name = ?1 WHERE id = ?2 AND trim(name) = ''",
                params![name, id],
            )?;
        }
        if let Some(phone) = blank_to_none(phone) {
            changed += self.conn.execute(
                "UPDATE employee SET phone = ?1
                 WHERE id = ?2 AND (phone IS NULL OR trim(phone) = '')",
                params![phone, id],
            )?;
        }
        Ok(changed > 0)
    }

    pub fn replace_employee_categories(
        &self,
        id: EmployeeId,
        categories: &CategorySet,
    ) -> OvertimeResult<()> {
        self.conn
            .execute("DELETE FROM employee_category WHERE employee_id = ?1", params![id])?;
        for c in categories {
            self.conn.execute(
                "INSERT OR IGNORE INTO employee_category (employee_id, category) VALUES (?1, ?2)",
                params![id, c.as_str()],
            )?;
        }
        Ok(())
    }

    pub fn employee_categories(&self, id: EmployeeId) -> OvertimeResult<CategorySet> {
        let mut stmt = self
            .conn
            .prepare("SELECT category FROM employee_category WHERE employee_id = ?1")?;
        let cats = stmt
            .query_map(params![id], |row| {
                let raw: String = row.get(0)?;
                parse_text::<Category>(0, &raw)
            })?
            .collect::<Result<CategorySet, _>>()?;
        Ok(cats)
    }

    pub fn employee_signup_count(&self, id: EmployeeId) -> OvertimeResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM signup WHERE employee_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete_employee(&self, id: EmployeeId) -> OvertimeResult<()> {
        self.conn
            .execute("DELETE FROM employee_category WHERE employee_id = ?1", params![id])?;
        self.conn.execute("DELETE FROM employee WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn with_categories(
        &self,
        found: Option<EmployeeRecord>,
    ) -> OvertimeResult<Option<EmployeeRecord>> {
        match found {
            Some(mut e) => {
                e.categories = self.employee_categories(e.id)?;
                Ok(Some(e))
            }
            None => Ok(None),
        }
    }
}

fn blank_to_none(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}
