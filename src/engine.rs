use log::{info, warn};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

use crate::aggregation::{build_snapshot, Snapshot};
use crate::config::EngineConfig;
use crate::congestion::{CongestionThresholds, ZoneId, ZoneState};
use crate::errors::EngineError;
use crate::preemption::coordinator::PreemptionCoordinator;
use crate::preemption::request::{EmergencyRequest, EmergencyVehicle, Priority, RequestId};
use crate::shared_data::{current_timestamp, AlertKind, EngineEvent};
use crate::signal::controller::SignalController;
use crate::signal::intersection::{IntersectionId, SignalTiming};
use crate::topology::NetworkTopology;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Inputs from dispatch and telemetry. Everything is buffered here and
/// drained at the next tick boundary; the engine never mutates its own
/// state between ticks, so transitions are linearizable and replayable.
enum Inbound {
    Emergency {
        id: RequestId,
        vehicle: EmergencyVehicle,
        priority: Priority,
        corridor: Vec<IntersectionId>,
    },
    VehicleCount {
        zone: ZoneId,
        count: i64,
        at: u64,
    },
    Clearance {
        request: RequestId,
        intersection: IntersectionId,
        at: u64,
    },
    Timing {
        intersection: IntersectionId,
        timing: SignalTiming,
    },
}

/// The authoritative engine state. The facade keeps it behind a single
/// mutex; snapshot readers and event subscribers never touch it.
struct EngineCore {
    clock: u64,
    thresholds: CongestionThresholds,
    alert_window_s: u64,
    topology: NetworkTopology,
    signals: SignalController,
    coordinator: PreemptionCoordinator,
    zones: BTreeMap<ZoneId, ZoneState>,
    /// Timestamps of recently raised alerts, pruned to the window.
    alert_log: VecDeque<u64>,
}

impl EngineCore {
    /// One scheduler tick: drain buffered inputs, advance every signal
    /// machine, resolve preemption, then build the snapshot. The
    /// (a) machines -> (b) preemption -> (c) snapshot order guarantees
    /// a phase change within a tick is visible to preemption logic and
    /// to the snapshot in the same tick.
    fn step(&mut self, inbound: Vec<Inbound>) -> (Snapshot, Vec<EngineEvent>) {
        self.clock += 1;
        let now = self.clock;
        let mut events = Vec::new();
        let mut submissions = Vec::new();
        let mut clearances = Vec::new();

        for item in inbound {
            match item {
                Inbound::VehicleCount { zone, count, at } => {
                    let Some(state) = self.zones.get_mut(&zone) else {
                        warn!("vehicle count for unknown zone {:?} dropped", zone);
                        continue;
                    };
                    if state.apply_count(count, &self.thresholds).is_err() {
                        warn!(
                            "dropping out-of-range count {} for zone '{}' (reported at {})",
                            count, state.zone.name, at
                        );
                        events.push(EngineEvent::Alert {
                            kind: AlertKind::TelemetryOutOfRange,
                            message: format!(
                                "out-of-range vehicle count {} for zone '{}' dropped",
                                count, state.zone.name
                            ),
                            request: None,
                            zone: Some(zone),
                            at: now,
                        });
                    }
                }
                Inbound::Timing { intersection, timing } => {
                    if self.signals.schedule_timing(intersection, timing) {
                        info!(
                            "intersection {:?} rescheduled to {:?}, effective next green",
                            intersection, timing
                        );
                    }
                }
                Inbound::Emergency { id, vehicle, priority, corridor } => {
                    submissions.push((id, vehicle, priority, corridor));
                }
                Inbound::Clearance { request, intersection, at } => {
                    clearances.push((request, intersection, at));
                }
            }
        }

        // (a) advance the machines.
        let phase_events = self.signals.tick_all(now);
        let changed: HashSet<IntersectionId> = phase_events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::PhaseChanged { intersection, .. } => Some(*intersection),
                _ => None,
            })
            .collect();
        events.extend(phase_events);

        // (b) preemption: new corridor claims, then the resolution pass.
        for (id, vehicle, priority, corridor) in submissions {
            let request = EmergencyRequest::new(id, vehicle, priority, corridor, now);
            let decision = self.coordinator.submit(
                request,
                &self.topology,
                &mut self.signals,
                now,
                &mut events,
            );
            info!("request {:?}: {:?}", id, decision);
        }
        events.extend(
            self.coordinator
                .resolve_tick(&mut self.signals, now, &changed, &clearances),
        );

        for event in &events {
            if matches!(event, EngineEvent::Alert { .. }) {
                self.alert_log.push_back(event.at());
            }
        }
        let horizon = now.saturating_sub(self.alert_window_s);
        while self.alert_log.front().is_some_and(|&at| at < horizon) {
            self.alert_log.pop_front();
        }

        // (c) publish the read model.
        let snapshot = build_snapshot(
            now,
            &self.zones,
            &self.signals,
            &self.coordinator,
            self.alert_log.len(),
        );
        (snapshot, events)
    }
}

/// Facade over the engine core: the dispatch/telemetry boundary on the
/// way in, snapshots and the event stream on the way out.
pub struct Engine {
    core: Mutex<EngineCore>,
    inbox: Mutex<Vec<Inbound>>,
    latest: RwLock<Arc<Snapshot>>,
    events_tx: broadcast::Sender<EngineEvent>,
    next_request_id: AtomicU64,
    tick_interval_s: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_start_time(config, current_timestamp())
    }

    /// Builds the engine with an explicit clock origin. Tests drive
    /// this with 0 so every timestamp is a plain tick count.
    pub fn with_start_time(config: EngineConfig, start: u64) -> Result<Self, EngineError> {
        config.validate()?;
        let topology = NetworkTopology::from_intersections(&config.intersections)?;
        let zones: BTreeMap<ZoneId, ZoneState> = config
            .zones
            .iter()
            .map(|z| (z.id, ZoneState::new(z.clone())))
            .collect();
        let signals = SignalController::new(config.intersections);
        let coordinator = PreemptionCoordinator::new(config.max_transit_s);
        let core = EngineCore {
            clock: start,
            thresholds: config.thresholds,
            alert_window_s: config.alert_window_s,
            topology,
            signals,
            coordinator,
            zones,
            alert_log: VecDeque::new(),
        };
        let initial = build_snapshot(start, &core.zones, &core.signals, &core.coordinator, 0);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            core: Mutex::new(core),
            inbox: Mutex::new(Vec::new()),
            latest: RwLock::new(Arc::new(initial)),
            events_tx,
            next_request_id: AtomicU64::new(1),
            tick_interval_s: config.tick_interval_s,
        })
    }

    pub fn tick_interval_s(&self) -> u64 {
        self.tick_interval_s
    }

    /// Submits an emergency corridor claim. The id is handed back
    /// immediately; resolution happens at the next tick and is
    /// observable through the event stream and the snapshot.
    pub fn submit_emergency_request(
        &self,
        vehicle: EmergencyVehicle,
        priority: Priority,
        corridor: Vec<IntersectionId>,
    ) -> RequestId {
        let id = RequestId(self.next_request_id.fetch_add(1, Ordering::SeqCst));
        self.inbox.lock().unwrap().push(Inbound::Emergency {
            id,
            vehicle,
            priority,
            corridor,
        });
        id
    }

    pub fn report_vehicle_count(&self, zone: ZoneId, count: i64, at: u64) {
        self.inbox
            .lock()
            .unwrap()
            .push(Inbound::VehicleCount { zone, count, at });
    }

    pub fn report_clearance(&self, request: RequestId, intersection: IntersectionId, at: u64) {
        self.inbox.lock().unwrap().push(Inbound::Clearance {
            request,
            intersection,
            at,
        });
    }

    /// Validates new durations synchronously; the change itself is
    /// buffered and takes effect at the intersection's next Green.
    pub fn configure_intersection(
        &self,
        intersection: IntersectionId,
        green_s: u32,
        red_s: u32,
    ) -> Result<(), EngineError> {
        let timing = SignalTiming { green_s, red_s };
        timing.validate()?;
        if !self.core.lock().unwrap().signals.contains(intersection) {
            return Err(EngineError::InvalidConfiguration(format!(
                "unknown intersection {:?}",
                intersection
            )));
        }
        self.inbox.lock().unwrap().push(Inbound::Timing {
            intersection,
            timing,
        });
        Ok(())
    }

    /// The latest read model; non-blocking for observers and never in
    /// the way of signal transitions beyond the pointer swap.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.latest.read().unwrap())
    }

    /// Push stream of engine events, at-least-once. Consumers filter by
    /// `EngineEvent::kind()` and must be idempotent on request state.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// Runs one scheduler tick and publishes the resulting snapshot.
    pub fn tick(&self) -> Arc<Snapshot> {
        let inbound: Vec<Inbound> = self.inbox.lock().unwrap().drain(..).collect();
        let (snapshot, events) = self.core.lock().unwrap().step(inbound);
        let snapshot = Arc::new(snapshot);
        *self.latest.write().unwrap() = Arc::clone(&snapshot);
        for event in events {
            // Send fails only when nobody is subscribed.
            let _ = self.events_tx.send(event);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::CongestionBand;

    fn engine() -> Engine {
        Engine::with_start_time(EngineConfig::demo(), 0).unwrap()
    }

    #[test]
    fn telemetry_flows_into_snapshot_totals() {
        let engine = engine();
        engine.report_vehicle_count(ZoneId(1), 234, 1);
        engine.report_vehicle_count(ZoneId(2), 156, 1);
        let snapshot = engine.tick();
        assert_eq!(snapshot.totals.vehicles, 390);
        assert_eq!(snapshot.zones[0].band, CongestionBand::Congested);
        assert_eq!(snapshot.zones[1].band, CongestionBand::Moderate);
    }

    #[test]
    fn negative_count_raises_warning_and_keeps_band() {
        let engine = engine();
        let mut rx = engine.subscribe();
        engine.report_vehicle_count(ZoneId(1), 234, 1);
        engine.tick();
        engine.report_vehicle_count(ZoneId(1), -3, 2);
        let snapshot = engine.tick();
        assert_eq!(snapshot.zones[0].vehicle_count, 234);
        assert_eq!(snapshot.zones[0].band, CongestionBand::Congested);
        assert_eq!(snapshot.totals.active_alerts, 1);

        let mut saw_warning = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(
                event,
                EngineEvent::Alert {
                    kind: AlertKind::TelemetryOutOfRange,
                    ..
                }
            ) {
                saw_warning = true;
            }
        }
        assert!(saw_warning);
    }

    #[test]
    fn configure_rejects_unknown_intersection_and_bad_bounds() {
        let engine = engine();
        assert!(engine
            .configure_intersection(IntersectionId(99), 45, 30)
            .is_err());
        assert!(engine
            .configure_intersection(IntersectionId(1), 10, 30)
            .is_err());
        assert!(engine
            .configure_intersection(IntersectionId(1), 60, 20)
            .is_ok());
    }

    #[test]
    fn request_ids_are_unique_and_sequential() {
        let engine = engine();
        let a = engine.submit_emergency_request(
            EmergencyVehicle::Ambulance,
            Priority::High,
            vec![IntersectionId(1), IntersectionId(2)],
        );
        let b = engine.submit_emergency_request(
            EmergencyVehicle::Fire,
            Priority::Critical,
            vec![IntersectionId(2), IntersectionId(1)],
        );
        assert_eq!(a, RequestId(1));
        assert_eq!(b, RequestId(2));
    }
}
