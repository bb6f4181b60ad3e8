use crate::sheet::SheetError;
use crate::store::StoreError;

/// Errors surfaced by the schedule pipeline. Nothing here is fatal to the
/// process: a fetch failure keeps the previous snapshot, a store failure
/// degrades per the fail-open rules.
#[derive(Debug)]
pub enum ScheduleError {
    SourceFetch(SheetError),
    Store(StoreError),
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::SourceFetch(e) => write!(f, "schedule source fetch failed: {e}"),
            ScheduleError::Store(e) => write!(f, "booking store error: {e}"),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl From<SheetError> for ScheduleError {
    fn from(e: SheetError) -> Self {
        ScheduleError::SourceFetch(e)
    }
}

impl From<StoreError> for ScheduleError {
    fn from(e: StoreError) -> Self {
        ScheduleError::Store(e)
    }
}
