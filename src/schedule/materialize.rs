use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use super::directive::{evaluate, parse_cell, SlotOutcome};
use crate::model::{building_address, Building, DateCell, Room, Snapshot};
use crate::sheet::{
    annotation_row, SheetTab, CAPACITY_ROW, EQUIPMENT_ROW, FIRST_ROOM_COL, ROOM_NUMBER_ROW,
    ROOM_TYPE_ROW,
};

/// Equipment marker for a remote-presence rig; lifted out of the equipment
/// list into `Room::remote_capable`.
const REMOTE_MARKER: &str = "Zoom";

/// Horizon date cells from `now`: the current day with already-started slots
/// dropped, then `days` full future days.
pub fn horizon_cells(now: NaiveDateTime, days: u32) -> Vec<DateCell> {
    let mut cells = Vec::with_capacity(days as usize + 1);
    cells.push(DateCell::new(now.date(), Some(now.time())));
    for i in 1..=i64::from(days) {
        cells.push(DateCell::new(now.date() + Duration::days(i), None));
    }
    cells
}

/// Expand every tab's recurrence grid into a fully populated snapshot.
///
/// Pure recurrence pass: every slot ends up free or directive-occupied;
/// confirmed bookings are merged afterwards by the reconciler. Directives
/// are only ever evaluated against horizon dates, so open-ended ranges stay
/// bounded by construction.
pub fn materialize(
    tabs: Vec<SheetTab>,
    now: NaiveDateTime,
    horizon_days: u32,
    upper_reference: NaiveDate,
) -> Snapshot {
    let horizon = horizon_cells(now, horizon_days);
    let buildings = tabs
        .into_iter()
        .map(|tab| materialize_tab(tab, &horizon, upper_reference))
        .collect();
    Snapshot {
        buildings,
        built_at: now,
    }
}

fn materialize_tab(
    mut tab: SheetTab,
    horizon: &[DateCell],
    upper_reference: NaiveDate,
) -> Building {
    // The provider stores a merged range's value top-left only.
    tab.expand_merges();

    let name = tab.title.trim().to_lowercase();
    let address = building_address(&name)
        .map(str::to_string)
        .unwrap_or_else(|| name.clone());

    let room_count = tab
        .grid
        .get(ROOM_NUMBER_ROW)
        .map_or(0, |row| row.len().saturating_sub(FIRST_ROOM_COL));

    let mut rooms = Vec::new();
    for i in 0..room_count {
        let col = FIRST_ROOM_COL + i;
        let number = tab.cell(ROOM_NUMBER_ROW, col).trim();
        if number.is_empty() {
            continue;
        }
        rooms.push(materialize_room(&tab, col, number, horizon, upper_reference));
    }

    Building {
        name,
        address,
        rooms,
    }
}

fn materialize_room(
    tab: &SheetTab,
    col: usize,
    number: &str,
    horizon: &[DateCell],
    upper_reference: NaiveDate,
) -> Room {
    let room_type = tab.cell(ROOM_TYPE_ROW, col).trim().to_string();

    let mut equipment: Vec<String> = tab
        .cell(EQUIPMENT_ROW, col)
        .split(['\n', '/'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let remote_capable = equipment.iter().any(|e| e == REMOTE_MARKER);
    equipment.retain(|e| e != REMOTE_MARKER);

    let capacity = tab.cell(CAPACITY_ROW, col).trim().parse::<u32>().ok();

    let mut dates = horizon.to_vec();
    for cell in &mut dates {
        let weekday = cell.weekday.num_days_from_monday() as usize;
        for slot in &mut cell.slots {
            // Row addressing uses the slot's canonical index, so a truncated
            // current day still reads the right grid cells.
            let Some(slot_idx) = crate::model::slot_index(slot.start, slot.end) else {
                continue;
            };
            let contents = tab.cell(annotation_row(weekday, slot_idx), col);
            let directives = parse_cell(contents);
            if directives.is_empty() {
                continue;
            }
            if let SlotOutcome::Occupied(occupant) =
                evaluate(&directives, cell.date, upper_reference)
            {
                slot.status.is_free = false;
                slot.status.name = Some(occupant.name);
                slot.status.comment = occupant.comment;
            }
        }
    }

    Room {
        number: number.to_string(),
        room_type,
        capacity,
        equipment,
        remote_capable,
        dates,
    }
}
