use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Fixed grid layout ─────────────────────────────────────────
//
// One tab per building. 0-based coordinates:
//   row 0          section header
//   row 1          room numbers
//   row 2          room type
//   row 3          equipment (newline- or slash-delimited)
//   row 4          capacity
//   rows 5..       7 weekday blocks, each a day-header row + 8 slot rows
// Room columns start at column 2.

pub const ROOM_NUMBER_ROW: usize = 1;
pub const ROOM_TYPE_ROW: usize = 2;
pub const EQUIPMENT_ROW: usize = 3;
pub const CAPACITY_ROW: usize = 4;
pub const GRID_BODY_START_ROW: usize = 5;
/// Rows per weekday block: one day-header row plus the eight slot rows.
pub const ROWS_PER_WEEKDAY: usize = 9;
pub const FIRST_ROOM_COL: usize = 2;

/// Row of the annotation cell for (weekday 0..6, slot 0..7).
pub fn annotation_row(weekday: usize, slot: usize) -> usize {
    GRID_BODY_START_ROW + ROWS_PER_WEEKDAY * weekday + slot
}

// ── Source table types ────────────────────────────────────────

/// A merged-cell rectangle, end-exclusive, as delivered by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

/// One building's raw cell table: an opaque 2-D string grid plus the merge
/// ranges needed to reconstruct values the provider only stores top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetTab {
    pub title: String,
    pub grid: Vec<Vec<String>>,
    #[serde(default)]
    pub merges: Vec<MergeRange>,
}

impl SheetTab {
    /// Cell contents at (row, col); ragged or short grids read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.grid
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Copy each merge range's top-left value into every covered cell.
    /// Cells outside the grid are ignored.
    pub fn expand_merges(&mut self) {
        for merge in self.merges.clone() {
            let value = self.cell(merge.start_row, merge.start_col).to_string();
            for row in merge.start_row..merge.end_row {
                for col in merge.start_col..merge.end_col {
                    if row == merge.start_row && col == merge.start_col {
                        continue;
                    }
                    if let Some(slot) = self.grid.get_mut(row).and_then(|r| r.get_mut(col)) {
                        *slot = value.clone();
                    }
                }
            }
        }
    }
}

// ── Source boundary ───────────────────────────────────────────

#[derive(Debug)]
pub enum SheetError {
    Io(String),
    Malformed(String),
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::Io(e) => write!(f, "sheet source I/O error: {e}"),
            SheetError::Malformed(e) => write!(f, "malformed sheet data: {e}"),
        }
    }
}

impl std::error::Error for SheetError {}

/// Delivers the raw per-building cell tables. The actual spreadsheet fetch
/// lives behind this seam; the engine only ever sees `SheetTab`s.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<SheetTab>, SheetError>;
}

/// File-backed source: a JSON array of tabs in the `SheetTab` shape.
/// Stands in for the remote provider in the daemon and in tests.
pub struct JsonSheetSource {
    path: PathBuf,
}

impl JsonSheetSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SheetSource for JsonSheetSource {
    async fn fetch(&self) -> Result<Vec<SheetTab>, SheetError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SheetError::Io(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw).map_err(|e| SheetError::Malformed(e.to_string()))
    }
}

/// Fixed in-memory source for tests and one-shot builds.
pub struct StaticSheetSource {
    tabs: Vec<SheetTab>,
}

impl StaticSheetSource {
    pub fn new(tabs: Vec<SheetTab>) -> Self {
        Self { tabs }
    }
}

#[async_trait]
impl SheetSource for StaticSheetSource {
    async fn fetch(&self) -> Result<Vec<SheetTab>, SheetError> {
        Ok(self.tabs.clone())
    }
}
