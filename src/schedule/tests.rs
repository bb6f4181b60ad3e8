use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use super::materialize::tests::{empty_tab, set_cell};
use super::*;
use crate::model::{CapacityBand, SlotStatus, SLOTS_PER_DAY};
use crate::sheet::StaticSheetSource;
use crate::store::{BookingStore, MemoryBookingStore};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// Monday 2025-09-01, midnight; also the parity reference.
fn now() -> NaiveDateTime {
    d(2025, 9, 1).and_hms_opt(0, 0, 0).unwrap()
}

/// Cache loaded with one building and the given rooms, empty annotations.
async fn cache_with_rooms(rooms: &[(&str, &str, &str, &str)]) -> ScheduleCache {
    let cache = ScheduleCache::new();
    let snapshot = materialize(vec![empty_tab("Родионова", rooms)], now(), 14, now().date());
    cache.replace(snapshot).await;
    cache
}

#[tokio::test]
async fn fresh_cache_is_empty() {
    let cache = ScheduleCache::new();
    assert!(cache.buildings().await.is_empty());
    assert!(cache.rooms_in_building("родионова").await.is_empty());
    assert!(cache.room("родионова", "204").await.is_none());
}

#[tokio::test]
async fn buildings_listing_preserves_order() {
    let cache = ScheduleCache::new();
    let tabs = vec![
        empty_tab("Сормово", &[("101", "", "", "")]),
        empty_tab("Костина", &[("201", "", "", "")]),
    ];
    cache.replace(materialize(tabs, now(), 7, now().date())).await;

    let buildings = cache.buildings().await;
    assert_eq!(
        buildings,
        vec![
            ("сормово".to_string(), "Сормовское ш., 30".to_string()),
            ("костина".to_string(), "ул. Костина, 2".to_string()),
        ]
    );
}

#[tokio::test]
async fn rooms_listed_in_source_order() {
    let cache = cache_with_rooms(&[
        ("204", "Лекционная", "", "80"),
        ("305", "Семинарская", "", "25"),
    ])
    .await;
    assert_eq!(cache.rooms_in_building("родионова").await, vec!["204", "305"]);
    assert!(cache.rooms_in_building("сормово").await.is_empty());
}

#[tokio::test]
async fn capacity_bands_filter_rooms() {
    let cache = cache_with_rooms(&[
        ("101", "", "", "25"),
        ("102", "", "", "30"),
        ("103", "", "", "60"),
        ("104", "", "", "90"),
        ("105", "", "", ""), // no capacity — matches nothing
    ])
    .await;

    let numbers = |rooms: Vec<crate::model::Room>| -> Vec<String> {
        rooms.into_iter().map(|r| r.number).collect()
    };

    assert_eq!(
        numbers(cache.rooms_matching_capacity("родионова", CapacityBand::Small).await),
        vec!["101"]
    );
    assert_eq!(
        numbers(cache.rooms_matching_capacity("родионова", CapacityBand::Medium).await),
        vec!["102", "103"]
    );
    assert_eq!(
        numbers(cache.rooms_matching_capacity("родионова", CapacityBand::Large).await),
        vec!["104"]
    );
}

#[tokio::test]
async fn room_query_returns_a_detached_copy() {
    let cache = cache_with_rooms(&[("204", "Лекционная", "", "40")]).await;

    let mut copy = cache.room("родионова", "204").await.unwrap();
    copy.dates[1].slots[0].status = SlotStatus::occupied(Some("мутация".into()), None);

    // The shared snapshot is unaffected by what callers do with the copy.
    let fresh = cache.room("родионова", "204").await.unwrap();
    assert!(fresh.dates[1].slots[0].status.is_free);
}

#[tokio::test]
async fn slots_for_weekday_uses_first_matching_date() {
    let mut tab = empty_tab("Родионова", &[("204", "", "", "")]);
    set_cell(&mut tab, 3, 0, 0, "$Бронь"); // every Thursday, slot 1
    let cache = ScheduleCache::new();
    cache.replace(materialize(vec![tab], now(), 14, now().date())).await;

    let slots = cache.slots_for_weekday("родионова", "204", Weekday::Thu).await;
    assert_eq!(slots.len(), SLOTS_PER_DAY);
    assert!(!slots[0].status.is_free);
    assert!(slots[1].status.is_free);

    assert!(cache
        .slots_for_weekday("родионова", "999", Weekday::Thu)
        .await
        .is_empty());
}

#[tokio::test]
async fn mark_slot_flips_exactly_one_slot() {
    let cache = cache_with_rooms(&[("204", "", "", "40"), ("305", "", "", "25")]).await;
    let before = cache.snapshot().await;

    let found = cache
        .mark_slot("родионова", "204", d(2025, 9, 2), t(9, 30), t(10, 50), true, Some("Иванов"))
        .await;
    assert!(found);

    // The rest of the snapshot is structurally identical: patching the one
    // expected status onto the before-image reproduces the after-image.
    let mut expected = before;
    expected
        .building_mut("родионова")
        .unwrap()
        .rooms
        .iter_mut()
        .find(|r| r.number == "204")
        .unwrap()
        .date_mut(d(2025, 9, 2))
        .unwrap()
        .slot_mut(t(9, 30), t(10, 50))
        .unwrap()
        .status = SlotStatus::occupied(Some("Иванов".into()), None);
    // Compare serialized forms — slot identity alone would not see statuses.
    assert_eq!(
        serde_json::to_value(cache.snapshot().await).unwrap(),
        serde_json::to_value(expected).unwrap()
    );
}

#[tokio::test]
async fn mark_slot_misses_report_false() {
    let cache = cache_with_rooms(&[("204", "", "", "40")]).await;

    // Unknown building / room / date / slot boundary.
    assert!(!cache.mark_slot("сормово", "204", d(2025, 9, 2), t(9, 30), t(10, 50), true, None).await);
    assert!(!cache.mark_slot("родионова", "999", d(2025, 9, 2), t(9, 30), t(10, 50), true, None).await);
    assert!(!cache.mark_slot("родионова", "204", d(2026, 1, 1), t(9, 30), t(10, 50), true, None).await);
    assert!(!cache.mark_slot("родионова", "204", d(2025, 9, 2), t(9, 0), t(10, 50), true, None).await);
}

#[tokio::test]
async fn replace_discards_unrecorded_patches() {
    let cache = cache_with_rooms(&[("204", "", "", "40")]).await;
    cache
        .mark_slot("родионова", "204", d(2025, 9, 2), t(9, 30), t(10, 50), true, Some("Иванов"))
        .await;

    // A rebuild from source data that knows nothing of the patch wins the
    // swap — the accepted trade-off; the store would restore it next cycle.
    let rebuilt = materialize(
        vec![empty_tab("Родионова", &[("204", "", "", "40")])],
        now(),
        14,
        now().date(),
    );
    cache.replace(rebuilt).await;

    let room = cache.room("родионова", "204").await.unwrap();
    let slot = room.date(d(2025, 9, 2)).unwrap().slots[1].clone();
    assert!(slot.status.is_free);
}

#[tokio::test]
async fn build_snapshot_merges_sheet_and_store() {
    let mut tab = empty_tab("Родионова", &[("204", "", "", "40")]);
    set_cell(&mut tab, 0, 0, 0, "$Лекция-поток"); // Mondays, slot 1

    let store = MemoryBookingStore::new();
    store
        .insert(7, "Иванов И.И.", "ул. Родионова, 136", "204", d(2025, 9, 2), t(9, 30), t(10, 50))
        .await
        .unwrap();

    let source = StaticSheetSource::new(vec![tab]);
    let snapshot = build_snapshot(&source, &store, now(), 14, now().date())
        .await
        .unwrap();

    let room = snapshot.buildings[0].room("204").unwrap();

    // Directive occupancy on Mondays.
    let monday = room.date(d(2025, 9, 8)).unwrap();
    assert_eq!(monday.slots[0].status.name.as_deref(), Some("Лекция"));
    assert_eq!(monday.slots[0].status.comment.as_deref(), Some("поток"));

    // Store occupancy on the booked Tuesday slot.
    let tuesday = room.date(d(2025, 9, 2)).unwrap();
    let booked = tuesday.slots.iter().find(|s| s.start == t(9, 30)).unwrap();
    assert!(!booked.status.is_free);
    assert_eq!(booked.status.name.as_deref(), Some("Иванов И.И."));
}

#[tokio::test]
async fn concurrent_readers_and_marker() {
    // The cache must stay consistent under parallel reads and mark_slot
    // writes; every reader sees a complete snapshot.
    let cache = Arc::new(cache_with_rooms(&[("204", "", "", "40")]).await);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..50 {
                if i % 2 == 0 {
                    let room = cache.room("родионова", "204").await.unwrap();
                    assert_eq!(room.dates.len(), 15);
                } else {
                    cache
                        .mark_slot(
                            "родионова",
                            "204",
                            d(2025, 9, 2),
                            t(9, 30),
                            t(10, 50),
                            true,
                            Some("Гонка"),
                        )
                        .await;
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let room = cache.room("родионова", "204").await.unwrap();
    let slot = room.date(d(2025, 9, 2)).unwrap().slots[1].clone();
    assert!(!slot.status.is_free);
}
