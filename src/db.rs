// Movement Store - SQLite persistence for kiosk movement events
//
// Append-only: events are inserted once and never mutated or deleted.
// Timestamps are stored as fixed-precision RFC 3339 text (always UTC, `Z`
// suffix) so the range scan in `query` compares them lexicographically.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use thiserror::Error;

use crate::movements::{Direction, MovementEvent};

/// Errors from the movement store. Callers surface these to the user;
/// an insert that fails has recorded nothing.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to open movement database at {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },
}

pub fn setup_database(conn: &Connection) -> Result<(), StorageError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS movement_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            area TEXT NOT NULL,
            direction TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            raw_input TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_movement_events_recorded_at
         ON movement_events(recorded_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_movement_events_area_recorded_at
         ON movement_events(area, recorded_at)",
        [],
    )?;

    Ok(())
}

/// Durable, ordered record of movement events.
///
/// The connection sits behind a mutex: concurrent kiosk sessions serialize
/// at this handle, so id assignment and visibility are atomic per event.
#[derive(Clone)]
pub struct MovementStore {
    conn: Arc<Mutex<Connection>>,
}

impl MovementStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.display().to_string(),
            source,
        })?;
        setup_database(&conn)?;
        Ok(MovementStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(MovementStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Inserts one event and returns the persisted representation with its
    /// assigned id. `recorded_at` defaults to now.
    pub fn insert(
        &self,
        name: &str,
        area: &str,
        direction: Direction,
        raw_input: Option<&str>,
        recorded_at: Option<DateTime<Utc>>,
    ) -> Result<MovementEvent, StorageError> {
        let recorded_at = recorded_at.unwrap_or_else(Utc::now);
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO movement_events (name, area, direction, recorded_at, raw_input)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                name,
                area,
                direction.as_str(),
                format_timestamp(recorded_at),
                raw_input,
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(MovementEvent {
            id,
            name: name.to_string(),
            area: area.to_string(),
            direction,
            recorded_at,
            raw_input: raw_input.map(str::to_string),
        })
    }

    /// Events with `start <= recorded_at < end`, ordered `(area ASC,
    /// recorded_at ASC, id ASC)` - the exact ordering the report grouping
    /// depends on. The id tiebreak keeps equal timestamps in insertion
    /// order.
    pub fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MovementEvent>, StorageError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, name, area, direction, recorded_at, raw_input
             FROM movement_events
             WHERE recorded_at >= ?1 AND recorded_at < ?2
             ORDER BY area ASC, recorded_at ASC, id ASC",
        )?;

        let events = stmt
            .query_map(
                params![format_timestamp(start), format_timestamp(end)],
                |row| {
                    let direction: String = row.get(3)?;
                    let recorded_at: String = row.get(4)?;

                    Ok(MovementEvent {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        area: row.get(2)?,
                        direction: Direction::from_input(&direction),
                        recorded_at: parse_timestamp(&recorded_at)
                            .ok_or(rusqlite::Error::InvalidQuery)?,
                        raw_input: row.get(5)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Total number of recorded events.
    pub fn count(&self) -> Result<i64, StorageError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM movement_events", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Fixed microsecond precision keeps every stored timestamp the same
/// width, which is what makes the text range scan correct.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
