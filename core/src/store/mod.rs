//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine never touches SQL; callers hand a finished `RunOutput`
//! to the store after the run.

mod churn;

pub use churn::StoredStrategy;

use crate::{config::EngineConfig, engine::RunSummary, error::ChurnResult};
use rusqlite::{params, Connection, OptionalExtension};

pub struct ChurnStore {
    conn: Connection,
}

impl ChurnStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> ChurnResult<Self> {
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
    pub fn in_memory() -> ChurnResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ChurnResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, version: &str, config: &EngineConfig) -> ChurnResult<()> {
        let config_json = serde_json::to_string(config)?;
        self.conn.execute(
            "INSERT INTO run (run_id, version, config_json) VALUES (?1, ?2, ?3)",
            params![run_id, version, config_json],
        )?;
        Ok(())
    }

    pub fn run_count(&self) -> ChurnResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM run", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn run_summary(&self, run_id: &str) -> ChurnResult<Option<RunSummary>> {
        let json: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT summary_json FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match json.flatten() {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }
}
