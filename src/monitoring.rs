use amiquip::{
    Connection, ConsumerMessage, ConsumerOptions, QueueDeclareOptions, Result as AmiquipResult,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

use crate::global_variables::{AMQP_URL, QUEUE_ALERTS, QUEUE_ENGINE_EVENTS, QUEUE_SNAPSHOTS};
use crate::shared_data::{current_timestamp, EngineEvent};

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: u64,
    pub raw_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: u64,
    pub raw_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: u64,
    pub kind: String,
    pub message: String,
}

// Listens to the snapshot queue and logs each record as raw JSON.
pub async fn listen_snapshots() -> AmiquipResult<()> {
    tokio::task::spawn_blocking(|| -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(AMQP_URL)?;
        let channel = connection.open_channel(None)?;
        let queue = channel.queue_declare(QUEUE_SNAPSHOTS, QueueDeclareOptions::default())?;
        let consumer = queue.consume(ConsumerOptions::default())?;
        for message in consumer.receiver() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    let ts = current_timestamp();
                    if let Ok(json_str) = std::str::from_utf8(&delivery.body) {
                        let record = SnapshotRecord {
                            timestamp: ts,
                            raw_data: json_str.to_string(),
                        };
                        log_snapshot(record);
                    }
                    consumer.ack(delivery)?;
                }
                other => {
                    println!("Snapshot consumer ended: {:?}", other);
                    break;
                }
            }
        }
        connection.close()
    })
    .await
    .unwrap()
}

// Listens to the engine event queue and logs each record.
pub async fn listen_engine_events() -> AmiquipResult<()> {
    tokio::task::spawn_blocking(|| -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(AMQP_URL)?;
        let channel = connection.open_channel(None)?;
        let queue = channel.queue_declare(QUEUE_ENGINE_EVENTS, QueueDeclareOptions::default())?;
        let consumer = queue.consume(ConsumerOptions::default())?;
        for message in consumer.receiver() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    let ts = current_timestamp();
                    if let Ok(json_str) = std::str::from_utf8(&delivery.body) {
                        let record = EventRecord {
                            timestamp: ts,
                            raw_data: json_str.to_string(),
                        };
                        log_engine_event(record);
                    }
                    consumer.ack(delivery)?;
                }
                other => {
                    println!("Engine event consumer ended: {:?}", other);
                    break;
                }
            }
        }
        connection.close()
    })
    .await
    .unwrap()
}

// Listens to the alert queue; alerts get structured columns so the
// history file is directly readable by operations staff.
pub async fn listen_alerts() -> AmiquipResult<()> {
    tokio::task::spawn_blocking(|| -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(AMQP_URL)?;
        let channel = connection.open_channel(None)?;
        let queue = channel.queue_declare(QUEUE_ALERTS, QueueDeclareOptions::default())?;
        let consumer = queue.consume(ConsumerOptions::default())?;
        for message in consumer.receiver() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    let ts = current_timestamp();
                    if let Ok(json_str) = std::str::from_utf8(&delivery.body) {
                        let record = match serde_json::from_str::<EngineEvent>(json_str) {
                            Ok(EngineEvent::Alert { kind, message, at, .. }) => AlertRecord {
                                timestamp: at,
                                kind: format!("{:?}", kind),
                                message,
                            },
                            _ => AlertRecord {
                                timestamp: ts,
                                kind: "Unknown".to_string(),
                                message: json_str.to_string(),
                            },
                        };
                        log_alert(record);
                    }
                    consumer.ack(delivery)?;
                }
                other => {
                    println!("Alert consumer ended: {:?}", other);
                    break;
                }
            }
        }
        connection.close()
    })
    .await
    .unwrap()
}

// Generic helper to log a record to a CSV file.
fn log_to_csv<T: Serialize>(filename: &str, record: &T) -> Result<(), Box<dyn Error>> {
    let file_exists = Path::new(filename).exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(filename)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

pub fn log_snapshot(record: SnapshotRecord) {
    if let Err(e) = log_to_csv("signal_snapshots.csv", &record) {
        eprintln!("Error logging snapshot: {}", e);
    }
}

pub fn log_engine_event(record: EventRecord) {
    if let Err(e) = log_to_csv("engine_events.csv", &record) {
        eprintln!("Error logging engine event: {}", e);
    }
}

pub fn log_alert(record: AlertRecord) {
    if let Err(e) = log_to_csv("engine_alerts.csv", &record) {
        eprintln!("Error logging alert: {}", e);
    }
}
