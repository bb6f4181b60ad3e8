use chrono::{Datelike, NaiveDate};

/// Whether `target` falls in an "upper" week of the bi-weekly alternation.
///
/// `reference` is any date inside a known upper week. The Monday of that
/// week starts the parity sequence; every second week from there is upper.
/// Holds for targets before the reference as well — the week offset is
/// floored toward negative infinity, not truncated toward zero.
pub fn is_upper_week(target: NaiveDate, reference: NaiveDate) -> bool {
    let reference_weekday = reference.weekday().num_days_from_monday() as i64;
    let first_upper_monday = reference - chrono::Duration::days(reference_weekday);
    let diff_days = (target - first_upper_monday).num_days();
    diff_days.div_euclid(7).rem_euclid(2) == 0
}
