use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Config;
use crate::observability;
use crate::schedule::{build_snapshot, ScheduleCache};
use crate::sheet::SheetSource;
use crate::store::BookingStore;

/// One rebuild cycle: fetch, materialize, and reconcile outside the cache
/// lock, then swap the snapshot in. On fetch failure the previous snapshot
/// stays published and the next cycle retries.
pub async fn refresh_once(
    cache: &ScheduleCache,
    source: &dyn SheetSource,
    store: &dyn BookingStore,
    config: &Config,
) {
    let started = Instant::now();
    metrics::counter!(observability::REFRESH_TOTAL).increment(1);

    match build_snapshot(
        source,
        store,
        config.now_local(),
        config.horizon_days,
        config.upper_week_reference,
    )
    .await
    {
        Ok(snapshot) => {
            let buildings = snapshot.buildings.len();
            cache.replace(snapshot).await;
            metrics::histogram!(observability::REFRESH_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
            info!(
                "schedule refreshed: {buildings} buildings in {:.1?}",
                started.elapsed()
            );
        }
        Err(e) => {
            metrics::counter!(observability::REFRESH_FAILURES_TOTAL).increment(1);
            warn!("schedule refresh failed, keeping previous snapshot: {e}");
        }
    }
}

/// Background task that rebuilds the shared schedule on a fixed interval.
/// The caller builds the initial snapshot before spawning this, so the
/// immediate first tick is consumed without a rebuild.
pub async fn run_refresh(
    cache: Arc<ScheduleCache>,
    source: Arc<dyn SheetSource>,
    store: Arc<dyn BookingStore>,
    config: Config,
) {
    let mut interval = tokio::time::interval(config.refresh_interval);
    interval.tick().await;
    loop {
        interval.tick().await;
        refresh_once(&cache, source.as_ref(), store.as_ref(), &config).await;
    }
}
