//! SQLite-backed reference implementation of every collaborator trait, plus
//! the write API the host application uses to persist activity.
//!
//! A single connection behind a mutex. Each trait call is one statement or
//! one transaction, so concurrent callers serialize on the lock and the
//! `(user, badge)` primary key settles award races.

mod activity;
mod catalog;
mod facts;
mod ledger;
mod schema;

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, Params};
use tracing::info;

use crate::error::StoreError;

pub use activity::Recorded;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!(path = %path.display(), "badge store opened");
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and tooling.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn count<P: Params>(&self, table: &'static str, sql: &str, params: P) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let value: i64 = conn.prepare_cached(sql)?.query_row(params, |row| row.get(0))?;
        to_count(table, value)
    }
}

fn millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(table: &'static str, ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| StoreError::corrupt(table, format!("timestamp {ms} out of range")))
}

fn to_count(table: &'static str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::corrupt(table, format!("negative count {value}")))
}
