//! Database migration system for firetrack.
//!
//! Tracks the schema version in the `metadata` table. Every table and index
//! of version 1 comes from [`SCHEMA_STATEMENTS`]; later versions add their
//! upgrade steps here.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist and records
/// [`CURRENT_VERSION`] on a fresh database.
///
/// # Errors
///
/// Returns an error if schema creation fails, or if the database was
/// written by a newer firetrack.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let stored = stored_version(conn)?;
    if stored > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {stored} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if stored < CURRENT_VERSION {
        info!(version = CURRENT_VERSION, "Recording schema version");
        store_version(conn, CURRENT_VERSION)?;
    } else {
        debug!(version = stored, "Schema up to date");
    }

    Ok(())
}

/// Stored schema version, or 0 for a fresh database.
fn stored_version(conn: &Connection) -> Result<i32> {
    let value = match conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get::<_, String>(0),
    ) {
        Ok(value) => value,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    value.parse().map_err(|_| Error::DatabaseMigration {
        message: format!("invalid schema version: {value}"),
    })
}

fn store_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}
