use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// The eight canonical daily slot boundaries as (hour, minute) pairs.
/// Every `TimeSlot` in the system carries one of these (start, end) pairs.
const SLOT_BOUNDS: [((u32, u32), (u32, u32)); 8] = [
    ((8, 0), (9, 20)),
    ((9, 30), (10, 50)),
    ((11, 10), (12, 30)),
    ((13, 0), (14, 20)),
    ((14, 40), (16, 0)),
    ((16, 20), (17, 40)),
    ((18, 10), (19, 30)),
    ((19, 40), (21, 0)),
];

pub const SLOTS_PER_DAY: usize = SLOT_BOUNDS.len();

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("canonical slot bound is a valid wall-clock time")
}

/// The daily slot template, all slots free.
pub fn canonical_slots() -> Vec<TimeSlot> {
    SLOT_BOUNDS
        .iter()
        .map(|&((sh, sm), (eh, em))| TimeSlot::new(hm(sh, sm), hm(eh, em)))
        .collect()
}

/// Index of a (start, end) pair within the canonical slot table.
pub fn slot_index(start: NaiveTime, end: NaiveTime) -> Option<usize> {
    SLOT_BOUNDS
        .iter()
        .position(|&((sh, sm), (eh, em))| hm(sh, sm) == start && hm(eh, em) == end)
}

/// Russian weekday label, matching the source timetable's day headers.
pub fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Понедельник",
        Weekday::Tue => "Вторник",
        Weekday::Wed => "Среда",
        Weekday::Thu => "Четверг",
        Weekday::Fri => "Пятница",
        Weekday::Sat => "Суббота",
        Weekday::Sun => "Воскресенье",
    }
}

// ── Slot status ───────────────────────────────────────────────

/// Occupancy of one slot. Not part of slot identity — two snapshots can
/// disagree on status while agreeing on the slot itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub is_free: bool,
    /// Occupant display name when occupied.
    pub name: Option<String>,
    /// Free-text reason when occupied.
    pub comment: Option<String>,
}

impl Default for SlotStatus {
    fn default() -> Self {
        Self {
            is_free: true,
            name: None,
            comment: None,
        }
    }
}

impl SlotStatus {
    pub fn occupied(name: Option<String>, comment: Option<String>) -> Self {
        Self {
            is_free: false,
            name,
            comment,
        }
    }
}

// ── Time slot ─────────────────────────────────────────────────

/// One bookable interval within a day.
///
/// Equality is by (start, end) only, so a freshly built template slot
/// compares equal to the same slot with a different status.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub status: SlotStatus,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        debug_assert!(start < end, "TimeSlot start must be before end");
        Self {
            start,
            end,
            status: SlotStatus::default(),
        }
    }

    /// Display label, e.g. "14:40-16:00".
    pub fn label(&self) -> String {
        format!(
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }

    /// 1-based class period number within the canonical day.
    pub fn period(&self) -> Option<usize> {
        slot_index(self.start, self.end).map(|i| i + 1)
    }
}

impl PartialEq for TimeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

// ── Date cell ─────────────────────────────────────────────────

/// One calendar date in a room's horizon with its applicable slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateCell {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub slots: Vec<TimeSlot>,
}

impl DateCell {
    /// Build a cell for `date`. When `after` is set (the current day), slots
    /// that already ended by that time are excluded; future days carry all
    /// eight.
    pub fn new(date: NaiveDate, after: Option<NaiveTime>) -> Self {
        use chrono::Datelike;
        let slots = canonical_slots()
            .into_iter()
            .filter(|s| after.is_none_or(|t| s.end > t))
            .collect();
        Self {
            date,
            weekday: date.weekday(),
            slots,
        }
    }

    pub fn weekday_label(&self) -> &'static str {
        weekday_label(self.weekday)
    }

    /// Display form of the date, e.g. "01.09.2025".
    pub fn date_label(&self) -> String {
        self.date.format("%d.%m.%Y").to_string()
    }

    pub fn slot_mut(&mut self, start: NaiveTime, end: NaiveTime) -> Option<&mut TimeSlot> {
        self.slots
            .iter_mut()
            .find(|s| s.start == start && s.end == end)
    }
}

// ── Room / Building / Snapshot ────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub number: String,
    pub room_type: String,
    pub capacity: Option<u32>,
    pub equipment: Vec<String>,
    /// Room supports remote presence (video-conferencing rig).
    pub remote_capable: bool,
    /// Horizon dates, strictly increasing.
    pub dates: Vec<DateCell>,
}

impl Room {
    pub fn date(&self, date: NaiveDate) -> Option<&DateCell> {
        self.dates.iter().find(|d| d.date == date)
    }

    pub fn date_mut(&mut self, date: NaiveDate) -> Option<&mut DateCell> {
        self.dates.iter_mut().find(|d| d.date == date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Internal key, the lowercased source tab title.
    pub name: String,
    /// Postal address shown to users.
    pub address: String,
    pub rooms: Vec<Room>,
}

impl Building {
    pub fn room(&self, number: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.number == number)
    }
}

/// One complete materialized view of every building, room, date, and slot.
/// Built by the materializer+reconciler pipeline, published wholesale, and
/// only ever patched through `SlotStatus` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub buildings: Vec<Building>,
    pub built_at: NaiveDateTime,
}

impl Snapshot {
    pub fn empty(built_at: NaiveDateTime) -> Self {
        Self {
            buildings: Vec::new(),
            built_at,
        }
    }

    pub fn building(&self, name: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.name == name)
    }

    pub fn building_mut(&mut self, name: &str) -> Option<&mut Building> {
        self.buildings.iter_mut().find(|b| b.name == name)
    }
}

// ── Capacity bands ────────────────────────────────────────────

/// Seat-count band used by room filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityBand {
    /// Fewer than 30 seats.
    Small,
    /// 30 to 60 seats inclusive.
    Medium,
    /// More than 60 seats.
    Large,
}

impl CapacityBand {
    /// Capacity-less rooms never match any band.
    pub fn matches(self, capacity: Option<u32>) -> bool {
        let Some(cap) = capacity else { return false };
        match self {
            CapacityBand::Small => cap < 30,
            CapacityBand::Medium => (30..=60).contains(&cap),
            CapacityBand::Large => cap > 60,
        }
    }
}

// ── Known buildings ───────────────────────────────────────────

/// Campus buildings with known postal addresses. Source tabs whose title is
/// not listed here fall back to the title itself as the address.
const BUILDING_ADDRESSES: [(&str, &str); 5] = [
    ("сормово", "Сормовское ш., 30"),
    ("родионова", "ул. Родионова, 136"),
    ("львовская", "ул. Львовская, 1в"),
    ("б.печерская", "ул. Большая Печерская, 25/12"),
    ("костина", "ул. Костина, 2"),
];

pub fn building_address(name: &str) -> Option<&'static str> {
    BUILDING_ADDRESSES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, addr)| *addr)
}
