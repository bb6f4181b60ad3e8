use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dashmap::DashMap;
use ulid::Ulid;

/// One confirmed booking, the authoritative record of an occupied slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRecord {
    pub id: Ulid,
    pub user_id: i64,
    /// Display name shown in the schedule for this booking.
    pub user_name: String,
    /// Building postal address, matching `Building::address`.
    pub building: String,
    pub room: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub created_at: NaiveDateTime,
}

#[derive(Debug)]
pub enum StoreError {
    /// A record for the same (building, room, date, start) already exists.
    DuplicateBooking { building: String, room: String, date: NaiveDate, start: NaiveTime },
    /// The store could not be reached; lookups degrade fail-open.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DuplicateBooking { building, room, date, start } => write!(
                f,
                "booking already exists for {building} room {room} on {date} at {start}"
            ),
            StoreError::Unavailable(e) => write!(f, "booking store unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The persistent booking table, seen through its CRUD seam.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Exact-match lookup for a confirmed booking.
    async fn find(
        &self,
        building: &str,
        room: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Option<BookingRecord>, StoreError>;

    /// Insert a new booking. Rejects a second record for the same
    /// (building, room, date, start) with `DuplicateBooking`.
    async fn insert(
        &self,
        user_id: i64,
        user_name: &str,
        building: &str,
        room: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<BookingRecord, StoreError>;

    /// All bookings made by one user, oldest first.
    async fn records_for_user(&self, user_id: i64) -> Result<Vec<BookingRecord>, StoreError>;
}

// ── In-memory implementation ──────────────────────────────────

type DayKey = (String, String, NaiveDate);

/// In-memory booking store, keyed by (building, room, date) for slot
/// lookups. Backs the daemon when no relational store is wired in, and all
/// of the tests.
pub struct MemoryBookingStore {
    records: DashMap<DayKey, Vec<BookingRecord>>,
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    fn key(building: &str, room: &str, date: NaiveDate) -> DayKey {
        (building.to_string(), room.to_string(), date)
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn find(
        &self,
        building: &str,
        room: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Option<BookingRecord>, StoreError> {
        let key = Self::key(building, room, date);
        Ok(self.records.get(&key).and_then(|day| {
            day.iter()
                .find(|r| r.start == start && r.end == end)
                .cloned()
        }))
    }

    async fn insert(
        &self,
        user_id: i64,
        user_name: &str,
        building: &str,
        room: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<BookingRecord, StoreError> {
        let key = Self::key(building, room, date);
        let mut day = self.records.entry(key).or_default();
        // Uniqueness on (building, room, date, start): the entry guard makes
        // the check-and-push atomic, so two racing inserts cannot both win.
        if day.iter().any(|r| r.start == start) {
            return Err(StoreError::DuplicateBooking {
                building: building.to_string(),
                room: room.to_string(),
                date,
                start,
            });
        }
        let record = BookingRecord {
            id: Ulid::new(),
            user_id,
            user_name: user_name.to_string(),
            building: building.to_string(),
            room: room.to_string(),
            date,
            start,
            end,
            created_at: chrono::Utc::now().naive_utc(),
        };
        day.push(record.clone());
        Ok(record)
    }

    async fn records_for_user(&self, user_id: i64) -> Result<Vec<BookingRecord>, StoreError> {
        let mut records: Vec<BookingRecord> = self
            .records
            .iter()
            .flat_map(|day| {
                day.value()
                    .iter()
                    .filter(|r| r.user_id == user_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}
