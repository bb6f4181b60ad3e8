use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use crate::observability;
use crate::schedule::{ScheduleCache, ScheduleError};
use crate::store::{BookingRecord, BookingStore, StoreError};

/// A user's request to book one slot. Carries both the building's internal
/// name (the cache key) and its postal address (the store key).
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: i64,
    pub user_name: String,
    pub building: String,
    pub address: String,
    pub room: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug)]
pub enum BookingOutcome {
    Confirmed(BookingRecord),
    /// Someone else's booking already covers the slot.
    SlotTaken,
}

/// Check-then-commit acceptance of a new booking: consult the store for a
/// conflicting record, insert, then patch the cache so the very next read
/// shows the slot occupied.
pub struct BookingGate {
    store: Arc<dyn BookingStore>,
    cache: Arc<ScheduleCache>,
}

impl BookingGate {
    pub fn new(store: Arc<dyn BookingStore>, cache: Arc<ScheduleCache>) -> Self {
        Self { store, cache }
    }

    pub async fn confirm(&self, req: BookingRequest) -> Result<BookingOutcome, ScheduleError> {
        let existing = self
            .store
            .find(&req.address, &req.room, req.date, req.start, req.end)
            .await?;
        if existing.is_some() {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Ok(BookingOutcome::SlotTaken);
        }

        // Two confirmations can both pass the check above; the store's
        // uniqueness rule breaks the tie and the loser gets the same
        // user-visible outcome.
        let record = match self
            .store
            .insert(
                req.user_id,
                &req.user_name,
                &req.address,
                &req.room,
                req.date,
                req.start,
                req.end,
            )
            .await
        {
            Ok(record) => record,
            Err(StoreError::DuplicateBooking { .. }) => {
                metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
                return Ok(BookingOutcome::SlotTaken);
            }
            Err(e) => return Err(e.into()),
        };

        // The store write is durable at this point. A cache miss here means
        // the slot reference went stale across a refresh swap — logged by
        // mark_slot, healed by the next rebuild — so the booking still
        // stands.
        self.cache
            .mark_slot(
                &req.building,
                &req.room,
                req.date,
                req.start,
                req.end,
                true,
                Some(&req.user_name),
            )
            .await;

        metrics::counter!(observability::BOOKINGS_CONFIRMED_TOTAL).increment(1);
        Ok(BookingOutcome::Confirmed(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Building, DateCell, Room, Snapshot};
    use crate::store::MemoryBookingStore;
    use async_trait::async_trait;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn request() -> BookingRequest {
        BookingRequest {
            user_id: 42,
            user_name: "Иванов И.И.".into(),
            building: "родионова".into(),
            address: "ул. Родионова, 136".into(),
            room: "204".into(),
            date: d(2025, 9, 2),
            start: t(9, 30),
            end: t(10, 50),
        }
    }

    async fn cache_with_slot() -> Arc<ScheduleCache> {
        let cache = Arc::new(ScheduleCache::new());
        cache
            .replace(Snapshot {
                buildings: vec![Building {
                    name: "родионова".into(),
                    address: "ул. Родионова, 136".into(),
                    rooms: vec![Room {
                        number: "204".into(),
                        room_type: "Лекционная".into(),
                        capacity: Some(40),
                        equipment: vec![],
                        remote_capable: false,
                        dates: vec![DateCell::new(d(2025, 9, 2), None)],
                    }],
                }],
                built_at: d(2025, 9, 1).and_hms_opt(0, 0, 0).unwrap(),
            })
            .await;
        cache
    }

    #[tokio::test]
    async fn confirm_inserts_and_patches_cache() {
        let store = Arc::new(MemoryBookingStore::new());
        let cache = cache_with_slot().await;
        let gate = BookingGate::new(store.clone(), cache.clone());

        let outcome = gate.confirm(request()).await.unwrap();
        let BookingOutcome::Confirmed(record) = outcome else {
            panic!("expected confirmation, got {outcome:?}");
        };
        assert_eq!(record.user_name, "Иванов И.И.");

        // Durable in the store...
        assert!(store
            .find("ул. Родионова, 136", "204", d(2025, 9, 2), t(9, 30), t(10, 50))
            .await
            .unwrap()
            .is_some());

        // ...and visible to the very next cache read.
        let room = cache.room("родионова", "204").await.unwrap();
        let slot = room.dates[0]
            .slots
            .iter()
            .find(|s| s.start == t(9, 30))
            .unwrap();
        assert!(!slot.status.is_free);
        assert_eq!(slot.status.name.as_deref(), Some("Иванов И.И."));
    }

    #[tokio::test]
    async fn second_confirmation_is_rejected() {
        let store = Arc::new(MemoryBookingStore::new());
        let cache = cache_with_slot().await;
        let gate = BookingGate::new(store, cache);

        assert!(matches!(
            gate.confirm(request()).await.unwrap(),
            BookingOutcome::Confirmed(_)
        ));
        assert!(matches!(
            gate.confirm(request()).await.unwrap(),
            BookingOutcome::SlotTaken
        ));
    }

    /// Store whose existence check is blind, forcing the gate through the
    /// insert path — models two confirmations racing past the check.
    struct BlindFindStore(MemoryBookingStore);

    #[async_trait]
    impl BookingStore for BlindFindStore {
        async fn find(
            &self,
            _building: &str,
            _room: &str,
            _date: NaiveDate,
            _start: NaiveTime,
            _end: NaiveTime,
        ) -> Result<Option<BookingRecord>, StoreError> {
            Ok(None)
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
            self.0
                .insert(user_id, user_name, building, room, date, start, end)
                .await
        }

        async fn records_for_user(&self, user_id: i64) -> Result<Vec<BookingRecord>, StoreError> {
            self.0.records_for_user(user_id).await
        }
    }

    #[tokio::test]
    async fn store_uniqueness_backstops_the_race() {
        let store = Arc::new(BlindFindStore(MemoryBookingStore::new()));
        let cache = cache_with_slot().await;
        let gate = BookingGate::new(store, cache);

        assert!(matches!(
            gate.confirm(request()).await.unwrap(),
            BookingOutcome::Confirmed(_)
        ));
        // The check sees nothing, but the insert loses the tie.
        assert!(matches!(
            gate.confirm(request()).await.unwrap(),
            BookingOutcome::SlotTaken
        ));
    }

    #[tokio::test]
    async fn stale_cache_still_confirms() {
        let store = Arc::new(MemoryBookingStore::new());
        // Empty cache: mark_slot will miss.
        let cache = Arc::new(ScheduleCache::new());
        let gate = BookingGate::new(store.clone(), cache);

        let outcome = gate.confirm(request()).await.unwrap();
        assert!(matches!(outcome, BookingOutcome::Confirmed(_)));
        // The record is the source of truth regardless.
        assert!(store
            .find("ул. Родионова, 136", "204", d(2025, 9, 2), t(9, 30), t(10, 50))
            .await
            .unwrap()
            .is_some());
    }
}
