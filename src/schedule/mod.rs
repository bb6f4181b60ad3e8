mod directive;
mod error;
mod materialize;
mod parity;
mod queries;
mod reconcile;
#[cfg(test)]
mod tests;

pub use directive::{evaluate, parse_cell, Directive, Occupant, SlotOutcome};
pub use error::ScheduleError;
pub use materialize::{horizon_cells, materialize};
pub use parity::is_upper_week;
pub use reconcile::reconcile;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::Mutex;

use crate::model::Snapshot;
use crate::observability;
use crate::sheet::SheetSource;
use crate::store::BookingStore;

/// Build one complete snapshot: fetch, materialize, reconcile.
///
/// This is the expensive path — callers run it without holding any cache
/// lock and publish the result with `ScheduleCache::replace`.
pub async fn build_snapshot(
    source: &dyn SheetSource,
    store: &dyn BookingStore,
    now: NaiveDateTime,
    horizon_days: u32,
    upper_reference: NaiveDate,
) -> Result<Snapshot, ScheduleError> {
    let tabs = source.fetch().await?;
    let mut snapshot = materialize(tabs, now, horizon_days, upper_reference);
    reconcile(&mut snapshot, store).await;
    Ok(snapshot)
}

/// Process-wide holder of the latest materialized schedule.
///
/// One lock, one snapshot. Every operation holds the lock for a bounded,
/// in-memory critical section; snapshot construction never happens under
/// it. Readers always observe a complete snapshot because publication is a
/// single swap, and a booking patched in with `mark_slot` is visible to the
/// very next read.
pub struct ScheduleCache {
    snapshot: Mutex<Snapshot>,
}

impl Default for ScheduleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleCache {
    /// Fresh cache with an empty snapshot; callers publish a real one via
    /// `replace` before serving traffic.
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(Snapshot::empty(chrono::Utc::now().naive_utc())),
        }
    }

    /// Publish a freshly built snapshot, discarding the previous one
    /// wholesale. Only the refresh path calls this; per-slot patches go
    /// through `mark_slot`.
    pub async fn replace(&self, snapshot: Snapshot) {
        let mut guard = self.snapshot.lock().await;
        *guard = snapshot;
    }

    /// Full copy of the current snapshot. Boundary copy for callers that
    /// need a consistent view without holding the lock (exports, tests).
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }

    /// Flip one slot's status in place, locating it by exact
    /// (building, room, date, start, end). Returns whether a matching slot
    /// was found; a miss means the caller's reference went stale across a
    /// refresh swap and the next rebuild will reconcile from the store.
    pub async fn mark_slot(
        &self,
        building: &str,
        room: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        occupied: bool,
        name: Option<&str>,
    ) -> bool {
        let mut guard = self.snapshot.lock().await;
        let Some(slot) = guard
            .building_mut(building)
            .and_then(|b| b.rooms.iter_mut().find(|r| r.number == room))
            .and_then(|r| r.date_mut(date))
            .and_then(|c| c.slot_mut(start, end))
        else {
            metrics::counter!(observability::MARK_SLOT_MISSES_TOTAL).increment(1);
            tracing::warn!(
                "mark_slot target not found: {building} room {room} {date} {start}-{end}"
            );
            return false;
        };
        slot.status.is_free = !occupied;
        if let Some(name) = name {
            slot.status.name = Some(name.to_string());
        }
        true
    }
}
