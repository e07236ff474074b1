use amiquip::{Connection, Exchange, Publish, QueueDeclareOptions, Result as AmiquipResult};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task;
use tokio::time::Duration;

use crate::engine::Engine;
use crate::global_variables::{AMQP_URL, QUEUE_ALERTS, QUEUE_ENGINE_EVENTS, QUEUE_SNAPSHOTS};
use crate::shared_data::EventKind;

/// Forwards the engine's event stream to the observer queues as JSON.
/// Alerts additionally land on their own queue so operations tooling
/// can consume them without filtering the full stream.
pub async fn publish_events(engine: Arc<Engine>) -> AmiquipResult<()> {
    let mut rx = engine.subscribe();
    task::spawn_blocking(move || -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(AMQP_URL)?;
        let channel = connection.open_channel(None)?;
        let exchange = Exchange::direct(&channel);
        channel.queue_declare(QUEUE_ENGINE_EVENTS, QueueDeclareOptions::default())?;
        channel.queue_declare(QUEUE_ALERTS, QueueDeclareOptions::default())?;
        info!("[Bridge] publishing engine events to '{}'", QUEUE_ENGINE_EVENTS);

        loop {
            match rx.blocking_recv() {
                Ok(event) => {
                    let Ok(payload) = serde_json::to_vec(&event) else {
                        continue;
                    };
                    exchange.publish(Publish::new(&payload, QUEUE_ENGINE_EVENTS))?;
                    if event.kind() == EventKind::Alert {
                        exchange.publish(Publish::new(&payload, QUEUE_ALERTS))?;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // At-least-once holds for what we do deliver; a lag
                    // only drops events the queue consumer never saw.
                    warn!("[Bridge] event stream lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        connection.close()
    })
    .await
    .unwrap()
}

/// Periodically publishes the latest snapshot for dashboard consumers.
pub async fn publish_snapshots(engine: Arc<Engine>, every: Duration) -> AmiquipResult<()> {
    task::spawn_blocking(move || -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(AMQP_URL)?;
        let channel = connection.open_channel(None)?;
        let exchange = Exchange::direct(&channel);
        channel.queue_declare(QUEUE_SNAPSHOTS, QueueDeclareOptions::default())?;
        info!("[Bridge] publishing snapshots to '{}'", QUEUE_SNAPSHOTS);

        loop {
            let snapshot = engine.snapshot();
            if let Ok(payload) = serde_json::to_vec(&*snapshot) {
                exchange.publish(Publish::new(&payload, QUEUE_SNAPSHOTS))?;
            }
            std::thread::sleep(every);
        }
    })
    .await
    .unwrap()
}
