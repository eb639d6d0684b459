//! Storage layer for firetrack.
//!
//! This module provides the `SQLite`-backed entity store. Every mutating
//! operation runs in its own transaction; an error anywhere inside it drops
//! the transaction, which rolls back every write made so far.

pub mod migrations;
pub mod schema;

mod equipment;
mod incidents;
mod records;
mod roster;
mod vehicles;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use incidents::IncidentDetail;
pub use roster::SeedReport;
pub use vehicles::{AssignmentSummary, SkippedVehicle};

/// The relational store for stations, apparatus, personnel and incidents.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Reject a vehicle that is active on any other incident.
    exclusive_assignments: bool,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn,
            exclusive_assignments: false,
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
            exclusive_assignments: false,
        })
    }

    /// Enforce that a vehicle is active on at most one incident.
    ///
    /// Off by default: only a second active assignment of the same vehicle
    /// to the same incident is rejected.
    #[must_use]
    pub fn with_exclusive_assignments(mut self, exclusive: bool) -> Self {
        self.exclusive_assignments = exclusive;
        self
    }

    /// Whether the global one-active-assignment rule is enforced.
    #[must_use]
    pub fn exclusive_assignments(&self) -> bool {
        self.exclusive_assignments
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a write transaction.
    ///
    /// `IMMEDIATE` takes the write lock up front, so a check followed by an
    /// insert cannot interleave with another writer.
    fn write_transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Run a single-value `COUNT(*)` query.
    pub(crate) fn count_rows(&self, sql: &str) -> Result<i64> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }

    /// Mean minutes from dispatch to arrival over incidents that have both.
    pub(crate) fn average_response_minutes(&self) -> Result<Option<f64>> {
        let average = self.conn.query_row(
            r"
            SELECT AVG((julianday(arrival_time) - julianday(dispatch_time)) * 1440.0)
            FROM incidents
            WHERE dispatch_time IS NOT NULL AND arrival_time IS NOT NULL
            ",
            [],
            |row| row.get(0),
        )?;
        Ok(average)
    }

    #[cfg(test)]
    pub(crate) fn conn_for_tests(&self) -> &Connection {
        &self.conn
    }
}

/// Format a timestamp the way every time column stores it.
pub(crate) fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current time, cut to the precision [`encode_time`] keeps.
///
/// Records returned from a write must equal the same records read back, so
/// every stamp a storage operation takes comes from here.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Trim free text, treating blank as absent.
fn optional_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

/// Reject a date pair where the second falls before the first.
fn ensure_date_order(
    first: &str,
    start: Option<DateTime<Utc>>,
    second: &str,
    end: Option<DateTime<Utc>>,
) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(Error::validation(format!(
            "{second} must not be before {first}"
        ))),
        _ => Ok(()),
    }
}

fn parse_time(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Read a non-null time column.
pub(crate) fn time_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_time(idx, &text)
}

/// Read a nullable time column.
pub(crate) fn opt_time_column(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| parse_time(idx, &text))
        .transpose()
}

/// Read a text enum column, falling back to a default on unknown values.
pub(crate) fn enum_column<T>(row: &rusqlite::Row, idx: usize, fallback: T) -> rusqlite::Result<T>
where
    T: FromStr + std::fmt::Display + Copy,
{
    let text: String = row.get(idx)?;
    Ok(text.parse().unwrap_or_else(|_| {
        warn!("Unknown value {:?} in column {}, defaulting to {}", text, idx, fallback);
        fallback
    }))
}
