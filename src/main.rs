use std::sync::Arc;

use tracing::info;

use aula::config::Config;
use aula::refresh;
use aula::schedule::ScheduleCache;
use aula::sheet::JsonSheetSource;
use aula::store::MemoryBookingStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    aula::observability::init(config.metrics_port);

    info!("aula starting");
    info!("  sheet_path: {}", config.sheet_path.display());
    info!("  horizon_days: {}", config.horizon_days);
    info!("  refresh_interval: {:?}", config.refresh_interval);
    info!(
        "  upper_week_reference: {}",
        config.upper_week_reference.format("%d.%m.%Y")
    );
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let cache = Arc::new(ScheduleCache::new());
    let source = Arc::new(JsonSheetSource::new(config.sheet_path.clone()));
    let store = Arc::new(MemoryBookingStore::new());

    // Populate the cache before anything reads it; a fetch failure here is
    // not fatal — the refresh loop keeps retrying against an empty snapshot.
    refresh::refresh_once(&cache, source.as_ref(), store.as_ref(), &config).await;

    tokio::spawn(refresh::run_refresh(
        cache.clone(),
        source,
        store,
        config.clone(),
    ));

    // Run until SIGTERM/ctrl-c; the refresh task needs no draining beyond
    // process shutdown.
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    info!("aula stopped");
    Ok(())
}
