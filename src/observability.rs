use std::net::SocketAddr;

// ── Refresh loop ────────────────────────────────────────────────

/// Counter: snapshot rebuilds attempted. Labels: status.
pub const REFRESH_TOTAL: &str = "aula_refresh_total";

/// Counter: rebuilds that failed to fetch the source.
pub const REFRESH_FAILURES_TOTAL: &str = "aula_refresh_failures_total";

/// Histogram: full rebuild duration in seconds (fetch + materialize +
/// reconcile, excluding the swap).
pub const REFRESH_DURATION_SECONDS: &str = "aula_refresh_duration_seconds";

// ── Ingestion quality ───────────────────────────────────────────

/// Counter: annotation clauses dropped as unparseable.
pub const PARSE_DEGRADATIONS_TOTAL: &str = "aula_parse_degradations_total";

/// Counter: booking-store lookups that failed during reconciliation.
pub const RECONCILE_FAILURES_TOTAL: &str = "aula_reconcile_failures_total";

// ── Booking gate ────────────────────────────────────────────────

/// Counter: bookings accepted and recorded.
pub const BOOKINGS_CONFIRMED_TOTAL: &str = "aula_bookings_confirmed_total";

/// Counter: booking attempts rejected because the slot was taken.
pub const BOOKING_CONFLICTS_TOTAL: &str = "aula_booking_conflicts_total";

/// Counter: mark_slot calls whose target slot no longer existed.
pub const MARK_SLOT_MISSES_TOTAL: &str = "aula_mark_slot_misses_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
