//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine calls store methods; it never executes SQL directly.
//!
//! Every signup or bump runs inside `with_slot_lock`, which holds SQLite's
//! write lock (`BEGIN IMMEDIATE`) from the first read to the commit. Each
//! kiosk owns its own connection; `reopen` hands out another one to the
//! same database file.

use crate::error::{OvertimeError, OvertimeResult};
use crate::types::SlotId;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;

mod employee;
mod signup;
mod slot;

pub use employee::{EmployeeProfile, EmployeeRecord};
pub use signup::{DayCounts, OccupantRecord};
pub use slot::{SlotRecord, WeekRecord};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SlotStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SlotStore {
    pub fn open(path: &str) -> OvertimeResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(Duration::from_millis(5_000))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> OvertimeResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> OvertimeResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// How long this connection waits for another kiosk's write lock.
    pub fn set_busy_timeout(&self, ms: u64) -> OvertimeResult<()> {
        self.conn.busy_timeout(Duration::from_millis(ms))?;
        Ok(())
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> OvertimeResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_bump_log.sql"))?;
        Ok(())
    }

    /// Run `f` as one all-or-nothing unit holding the write lock for `slot_id`.
    ///
    /// `Ok` commits; `Err` (or a panic) drops the transaction, rolling back
    /// every insert, delete and audit row written by `f`.
    pub fn with_slot_lock<T, F>(&self, slot_id: SlotId, f: F) -> OvertimeResult<T>
    where
        F: FnOnce(&SlotStore) -> OvertimeResult<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        log::debug!("slot={slot_id} lock acquired");
        let value = f(self)?;
        tx.commit()?;
        log::debug!("slot={slot_id} committed");
        Ok(value)
    }

    /// Admin mutations that touch several rows use the same discipline.
    pub fn with_write_lock<T, F>(&self, f: F) -> OvertimeResult<T>
    where
        F: FnOnce(&SlotStore) -> OvertimeResult<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> OvertimeResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

// ── Column encoding ────────────────────────────────────────────

pub(crate) fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT).map_err(|e| conversion(idx, e))
}

pub(crate) fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| conversion(idx, e))
}

/// Parse a TEXT column into one of the closed domain enums.
pub(crate) fn parse_text<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = OvertimeError>,
{
    raw.parse::<T>().map_err(|e| conversion(idx, e))
}

fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// True when `e` is a UNIQUE/PRIMARY KEY violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
