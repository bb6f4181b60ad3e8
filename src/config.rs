use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

/// Runtime configuration, read once from `AULA_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file the sheet source reads its tabs from.
    pub sheet_path: PathBuf,
    /// Future days to materialize beyond the current one.
    pub horizon_days: u32,
    /// Interval between full snapshot rebuilds.
    pub refresh_interval: Duration,
    /// Campus wall-clock offset from UTC, in hours.
    pub tz_offset_hours: i64,
    /// A date inside a known "upper" week, anchoring the bi-weekly parity.
    pub upper_week_reference: NaiveDate,
    /// Prometheus exporter port; metrics disabled when unset.
    pub metrics_port: Option<u16>,
}

/// Reference date format used in configuration, same as the sheet notation.
pub fn parse_reference_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y").ok()
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let refresh_minutes: u64 = env_or("AULA_REFRESH_INTERVAL_MINUTES", 5);
        let upper_week_reference = std::env::var("AULA_UPPER_WEEK_DATE")
            .ok()
            .and_then(|s| parse_reference_date(&s))
            .unwrap_or_else(|| {
                NaiveDate::from_ymd_opt(2025, 9, 1)
                    .expect("default parity reference is a valid date")
            });
        Self {
            sheet_path: PathBuf::from(
                std::env::var("AULA_SHEET_PATH").unwrap_or_else(|_| "./sheets.json".into()),
            ),
            horizon_days: env_or("AULA_HORIZON_DAYS", 7),
            refresh_interval: Duration::from_secs(refresh_minutes * 60),
            tz_offset_hours: env_or("AULA_TZ_OFFSET_HOURS", 3),
            upper_week_reference,
            metrics_port: std::env::var("AULA_METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Campus-local "now" for horizon construction.
    pub fn now_local(&self) -> NaiveDateTime {
        chrono::Utc::now().naive_utc() + chrono::Duration::hours(self.tz_offset_hours)
    }
}
