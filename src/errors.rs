use thiserror::Error;

/// Engine-level failures. Telemetry problems are recoverable (the
/// offending reading is dropped); configuration and corridor problems
/// are reported back to the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid corridor: {0}")]
    InvalidCorridor(String),

    #[error("vehicle count {count} is out of range")]
    TelemetryOutOfRange { count: i64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
