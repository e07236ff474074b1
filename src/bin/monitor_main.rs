use traffic_signal_engine::monitoring::{listen_alerts, listen_engine_events, listen_snapshots};

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("[Monitor] consuming engine queues; records are appended to CSV history files.");

    let snapshots = tokio::spawn(listen_snapshots());
    let events = tokio::spawn(listen_engine_events());
    let alerts = tokio::spawn(listen_alerts());

    let _ = tokio::try_join!(snapshots, events, alerts);
}
