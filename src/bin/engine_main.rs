use log::info;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use traffic_signal_engine::config::EngineConfig;
use traffic_signal_engine::engine::Engine;
use traffic_signal_engine::preemption::request::{EmergencyVehicle, Priority};
use traffic_signal_engine::signal::intersection::IntersectionId;
use traffic_signal_engine::{bridge, scheduler};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(&path).expect("load engine config"),
        None => EngineConfig::demo(),
    };
    let engine = Arc::new(Engine::new(config).expect("start engine"));

    tokio::spawn(scheduler::run_engine_loop(Arc::clone(&engine)));
    tokio::spawn(bridge::publish_events(Arc::clone(&engine)));
    tokio::spawn(bridge::publish_snapshots(
        Arc::clone(&engine),
        Duration::from_secs(5),
    ));

    // Exercise the dispatch boundary the same way real dispatch would:
    // an ambulance corridor across the demo network.
    sleep(Duration::from_secs(3)).await;
    let id = engine.submit_emergency_request(
        EmergencyVehicle::Ambulance,
        Priority::High,
        vec![IntersectionId(1), IntersectionId(2)],
    );
    info!("submitted demonstration corridor request {:?}", id);

    loop {
        sleep(Duration::from_secs(5)).await;
        let snapshot = engine.snapshot();
        info!(
            "t={} vehicles={} avg_congestion={:.0}% operating={} alerts={}",
            snapshot.timestamp,
            snapshot.totals.vehicles,
            snapshot.totals.avg_congestion,
            snapshot.totals.operating_signals,
            snapshot.totals.active_alerts
        );
    }
}
