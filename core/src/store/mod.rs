//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Services call store methods; they never execute SQL directly.
//!
//! RULE: Aggregate totals change only through tally increments applied in
//! SQL (`col = col + n`), never by reading a total and writing it back.

mod bill_run;
mod customer;
mod invoice;
mod regime;
mod transaction;

pub use regime::Counter;

use crate::error::ChargingResult;
use crate::records::Totals;
use rusqlite::{Connection, Row};

pub struct ChargingStore {
    conn: Connection,
}

impl ChargingStore {
    pub fn open(path: &str) -> ChargingResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ChargingResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply the schema. Safe to run more than once.
    pub fn migrate(&self) -> ChargingResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    /// Run `f` inside one SQLite transaction. Any error rolls everything
    /// back. Must not be nested.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> ChargingResult<T>) -> ChargingResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Column list of the tally columns, for SELECTs.
const TALLY_SELECT: &str = "credit_line_count, credit_line_value, debit_line_count, debit_line_value, \
     zero_line_count, subject_to_minimum_charge_count, \
     subject_to_minimum_charge_credit_value, subject_to_minimum_charge_debit_value";

/// Read the eight tally columns starting at `first`.
fn totals_from_row(row: &Row<'_>, first: usize) -> rusqlite::Result<Totals> {
    Ok(Totals {
        credit_line_count: row.get(first)?,
        credit_line_value: row.get(first + 1)?,
        debit_line_count: row.get(first + 2)?,
        debit_line_value: row.get(first + 3)?,
        zero_line_count: row.get(first + 4)?,
        subject_to_minimum_charge_count: row.get(first + 5)?,
        subject_to_minimum_charge_credit_value: row.get(first + 6)?,
        subject_to_minimum_charge_debit_value: row.get(first + 7)?,
    })
}

/// `a = expr, b = expr` from patch fields.
fn patch_clause(fields: &[(&'static str, String)]) -> String {
    fields
        .iter()
        .map(|(col, expr)| format!("{col} = {expr}"))
        .collect::<Vec<_>>()
        .join(", ")
}
