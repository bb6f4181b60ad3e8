use chrono::Weekday;

use super::ScheduleCache;
use crate::model::{CapacityBand, Room, TimeSlot};

/// Point queries over the current snapshot. Each acquires the cache lock for
/// the duration of the read and clones what it hands out — callers never
/// hold references into the shared snapshot.
impl ScheduleCache {
    /// Ordered (name, address) pairs for every building.
    pub async fn buildings(&self) -> Vec<(String, String)> {
        let guard = self.snapshot.lock().await;
        guard
            .buildings
            .iter()
            .map(|b| (b.name.clone(), b.address.clone()))
            .collect()
    }

    /// Room numbers of a building, in source order.
    pub async fn rooms_in_building(&self, building: &str) -> Vec<String> {
        let guard = self.snapshot.lock().await;
        guard
            .building(building)
            .map(|b| b.rooms.iter().map(|r| r.number.clone()).collect())
            .unwrap_or_default()
    }

    /// Rooms of a building whose capacity falls in the band. Rooms without a
    /// known capacity never match.
    pub async fn rooms_matching_capacity(
        &self,
        building: &str,
        band: CapacityBand,
    ) -> Vec<Room> {
        let guard = self.snapshot.lock().await;
        guard
            .building(building)
            .map(|b| {
                b.rooms
                    .iter()
                    .filter(|r| band.matches(r.capacity))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// One room with its full horizon, or None if the building or room is
    /// unknown.
    pub async fn room(&self, building: &str, number: &str) -> Option<Room> {
        let guard = self.snapshot.lock().await;
        guard.building(building).and_then(|b| b.room(number)).cloned()
    }

    /// Template slots of a room for a weekday — the first horizon date
    /// falling on that weekday, statuses included. Used by the front-end
    /// before a concrete date is chosen.
    pub async fn slots_for_weekday(
        &self,
        building: &str,
        number: &str,
        weekday: Weekday,
    ) -> Vec<TimeSlot> {
        let guard = self.snapshot.lock().await;
        guard
            .building(building)
            .and_then(|b| b.room(number))
            .and_then(|r| r.dates.iter().find(|c| c.weekday == weekday))
            .map(|c| c.slots.clone())
            .unwrap_or_default()
    }
}
