// Movement Service - the single writer path from resolved identity to
// persisted event.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Serialize, Serializer};

use crate::db::{MovementStore, StorageError};

/// Movement polarity. Stored as 3-char text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Lenient parse: case-insensitive, unrecognized input falls back to
    /// `In`.
    pub fn from_input(raw: &str) -> Direction {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OUT" => Direction::Out,
            _ => Direction::In,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

/// One recorded movement. Immutable once created; the store assigns the id.
///
/// The serialized form is what the report consumers see: it omits the
/// internal id, renders `recorded_at` as ISO 8601, and renders a missing
/// `raw_input` as the empty string.
#[derive(Debug, Clone, Serialize)]
pub struct MovementEvent {
    #[serde(skip_serializing)]
    pub id: i64,
    pub name: String,
    pub area: String,
    pub direction: Direction,
    pub recorded_at: DateTime<Utc>,
    #[serde(serialize_with = "raw_input_or_empty")]
    pub raw_input: Option<String>,
}

fn raw_input_or_empty<S: Serializer>(
    raw_input: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(raw_input.as_deref().unwrap_or(""))
}

/// Handles persistence of sign-in events.
#[derive(Clone)]
pub struct MovementService {
    store: MovementStore,
}

impl MovementService {
    pub fn new(store: MovementStore) -> Self {
        MovementService { store }
    }

    pub fn store(&self) -> &MovementStore {
        &self.store
    }

    /// Records exactly one event per call - no dedup, no rate limiting.
    ///
    /// `name` must be non-empty and is trusted to be a canonical directory
    /// name; the caller already resolved it. `direction` is normalized,
    /// with unrecognized values recorded as `IN`.
    pub fn record_event(
        &self,
        name: &str,
        area: &str,
        direction: &str,
        raw_input: Option<&str>,
    ) -> Result<MovementEvent, StorageError> {
        self.record_event_at(name, area, direction, raw_input, None)
    }

    /// As `record_event`, with an explicit timestamp (backfills, tests).
    pub fn record_event_at(
        &self,
        name: &str,
        area: &str,
        direction: &str,
        raw_input: Option<&str>,
        recorded_at: Option<DateTime<Utc>>,
    ) -> Result<MovementEvent, StorageError> {
        debug_assert!(!name.trim().is_empty(), "record_event requires a name");
        let direction = Direction::from_input(direction);

        tracing::info!(
            name,
            area,
            direction = direction.as_str(),
            "recording movement event"
        );
        self.store.insert(name, area, direction, raw_input, recorded_at)
    }

    /// All events whose `recorded_at` falls on `target_date`, ordered
    /// `(area, recorded_at)`.
    pub fn events_for_date(
        &self,
        target_date: NaiveDate,
    ) -> Result<Vec<MovementEvent>, StorageError> {
        let (start, end) = day_interval(target_date);
        self.store.query(start, end)
    }
}

/// Half-open `[midnight, next midnight)` UTC interval for a calendar day.
pub fn day_interval(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}
