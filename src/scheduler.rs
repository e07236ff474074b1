use log::debug;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use crate::engine::Engine;

/// Drives the engine's logical clock at the configured fixed interval.
/// This function is intended to be spawned as an async task; each pass
/// runs one full tick (machines, preemption, snapshot) and then sleeps.
pub async fn run_engine_loop(engine: Arc<Engine>) {
    let interval = Duration::from_secs(engine.tick_interval_s());
    loop {
        let snapshot = engine.tick();
        debug!(
            "tick {}: {} vehicles, {} open emergencies, {} active alerts",
            snapshot.timestamp,
            snapshot.totals.vehicles,
            snapshot.active_emergencies.len(),
            snapshot.totals.active_alerts
        );
        sleep(interval).await;
    }
}
