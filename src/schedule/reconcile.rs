use crate::model::Snapshot;
use crate::observability;
use crate::store::BookingStore;

/// Merge confirmed bookings into a freshly materialized snapshot.
///
/// Only slots the recurrence data left free are consulted — sheet-derived
/// occupancy is authoritative and never overridden by the store. A failed
/// lookup leaves the slot at its sheet-derived status (fail-open) so a
/// flaky store can at worst under-report occupancy, never invent it.
pub async fn reconcile(snapshot: &mut Snapshot, store: &dyn BookingStore) {
    for building in &mut snapshot.buildings {
        let address = building.address.clone();
        for room in &mut building.rooms {
            for cell in &mut room.dates {
                for slot in &mut cell.slots {
                    if !slot.status.is_free {
                        continue;
                    }
                    match store
                        .find(&address, &room.number, cell.date, slot.start, slot.end)
                        .await
                    {
                        Ok(Some(record)) => {
                            slot.status.is_free = false;
                            slot.status.name = Some(record.user_name);
                            slot.status.comment = None;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            metrics::counter!(observability::RECONCILE_FAILURES_TOTAL)
                                .increment(1);
                            tracing::debug!(
                                "booking lookup failed for {address} {} {} {}: {e}",
                                room.number,
                                cell.date,
                                slot.label(),
                            );
                        }
                    }
                }
            }
        }
    }
}
