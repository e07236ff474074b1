// src/shared_data.rs

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::congestion::ZoneId;
use crate::preemption::request::{RequestId, RequestState};
use crate::signal::intersection::{IntersectionId, SignalPhase};

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Alert categories surfaced to observers. Timeouts are a safety
/// condition; telemetry warnings are data-quality only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    TransitTimeout,
    TelemetryOutOfRange,
}

/// Events pushed to observers. Delivery is at-least-once; consumers
/// must be idempotent on (request id, new state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    PhaseChanged {
        intersection: IntersectionId,
        old_phase: SignalPhase,
        new_phase: SignalPhase,
        at: u64,
    },
    RequestStateChanged {
        request: RequestId,
        old_state: RequestState,
        new_state: RequestState,
        at: u64,
    },
    Alert {
        kind: AlertKind,
        message: String,
        request: Option<RequestId>,
        zone: Option<ZoneId>,
        at: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PhaseChanged,
    RequestStateChanged,
    Alert,
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::PhaseChanged { .. } => EventKind::PhaseChanged,
            EngineEvent::RequestStateChanged { .. } => EventKind::RequestStateChanged,
            EngineEvent::Alert { .. } => EventKind::Alert,
        }
    }

    pub fn at(&self) -> u64 {
        match self {
            EngineEvent::PhaseChanged { at, .. }
            | EngineEvent::RequestStateChanged { at, .. }
            | EngineEvent::Alert { at, .. } => *at,
        }
    }
}
