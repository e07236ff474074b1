use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::congestion::{CongestionBand, ZoneId, ZoneState};
use crate::preemption::coordinator::PreemptionCoordinator;
use crate::preemption::request::{EmergencyVehicle, Priority, RequestId, RequestState};
use crate::signal::controller::SignalController;
use crate::signal::intersection::{IntersectionId, OperationalStatus, SignalPhase};

/// A consistent point-in-time read model, rebuilt on every scheduler
/// tick. This is the only state external observers may read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: u64,
    pub zones: Vec<ZoneSnapshot>,
    pub intersections: Vec<IntersectionSnapshot>,
    pub active_emergencies: Vec<EmergencySnapshot>,
    pub totals: SnapshotTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub id: ZoneId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub vehicle_count: u32,
    pub band: CongestionBand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionSnapshot {
    pub id: IntersectionId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub phase: SignalPhase,
    pub status: OperationalStatus,
    pub overridden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencySnapshot {
    pub id: RequestId,
    pub vehicle: EmergencyVehicle,
    pub priority: Priority,
    pub state: RequestState,
    pub corridor: Vec<IntersectionId>,
    pub requested_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTotals {
    pub vehicles: u64,
    /// Band-weighted 0-100 gauge: Clear 0, Moderate 50, Congested 100.
    pub avg_congestion: f64,
    pub operating_signals: usize,
    pub active_alerts: usize,
}

/// Builds the tick's snapshot from the live state. Runs after machine
/// advance and preemption resolution so phase changes from this tick
/// are already visible.
pub fn build_snapshot(
    now: u64,
    zones: &BTreeMap<ZoneId, ZoneState>,
    signals: &SignalController,
    coordinator: &PreemptionCoordinator,
    active_alerts: usize,
) -> Snapshot {
    let zone_rows: Vec<ZoneSnapshot> = zones
        .values()
        .map(|state| ZoneSnapshot {
            id: state.zone.id,
            name: state.zone.name.clone(),
            x: state.zone.x,
            y: state.zone.y,
            vehicle_count: state.vehicle_count,
            band: state.band,
        })
        .collect();

    let intersections: Vec<IntersectionSnapshot> = signals
        .iter()
        .map(|machine| {
            let i = machine.intersection();
            IntersectionSnapshot {
                id: i.id,
                name: i.name.clone(),
                x: i.x,
                y: i.y,
                phase: machine.phase(),
                status: machine.status(),
                overridden: machine.is_overridden(),
            }
        })
        .collect();

    let active_emergencies: Vec<EmergencySnapshot> = coordinator
        .open_requests()
        .into_iter()
        .map(|r| EmergencySnapshot {
            id: r.id,
            vehicle: r.vehicle,
            priority: r.priority,
            state: r.state,
            corridor: r.corridor.clone(),
            requested_at: r.requested_at,
        })
        .collect();

    let vehicles: u64 = zone_rows.iter().map(|z| z.vehicle_count as u64).sum();
    let avg_congestion = if zone_rows.is_empty() {
        0.0
    } else {
        zone_rows.iter().map(|z| z.band.score() as f64).sum::<f64>() / zone_rows.len() as f64
    };

    Snapshot {
        timestamp: now,
        zones: zone_rows,
        intersections,
        active_emergencies,
        totals: SnapshotTotals {
            vehicles,
            avg_congestion,
            operating_signals: signals.operating_count(),
            active_alerts,
        },
    }
}
