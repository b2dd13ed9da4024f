//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Matcher, resolver and inventory call store methods; they never execute SQL.

use crate::error::FinanceResult;
use rusqlite::{Connection, OpenFlags};

mod catalog;
mod inventory;

pub use catalog::{RateSheetRow, RateSheetSummary};

pub struct FinanceStore {
    conn: Connection,
}

impl FinanceStore {
    pub fn open(path: &str) -> FinanceResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FinanceResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> FinanceResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_financing_catalog.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_inventory.sql"))?;
        Ok(())
    }
}

fn to_bool(v: i64) -> bool {
    v != 0
}

fn from_bool(b: bool) -> i64 {
    if b { 1 } else { 0 }
}
