use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use crate::errors::EngineError;
use crate::preemption::request::{
    EmergencyRequest, Priority, RejectReason, RequestId, RequestState,
};
use crate::shared_data::{AlertKind, EngineEvent};
use crate::signal::controller::SignalController;
use crate::signal::intersection::{IntersectionId, OperationalStatus, SignalPhase};
use crate::topology::NetworkTopology;

/// Outcome of a corridor request, returned synchronously to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorridorDecision {
    Granted,
    Queued,
    Rejected,
}

/// Single writer of corridor overrides. Every grant and release goes
/// through this struct, so an intersection can never carry two live
/// overrides: the binding map is keyed by intersection.
pub struct PreemptionCoordinator {
    max_transit_s: u64,
    requests: HashMap<RequestId, EmergencyRequest>,
    /// Live override bindings, at most one per intersection.
    overrides: HashMap<IntersectionId, RequestId>,
    /// Requests waiting behind an equal-or-higher-priority holder.
    queued: Vec<RequestId>,
    blocked_on: HashMap<RequestId, HashSet<IntersectionId>>,
    /// Intersections released since the last retry pass; queued
    /// requests are only re-examined when something they were blocked
    /// on is touched, never on a busy-poll.
    freed: HashSet<IntersectionId>,
}

impl PreemptionCoordinator {
    pub fn new(max_transit_s: u64) -> Self {
        Self {
            max_transit_s,
            requests: HashMap::new(),
            overrides: HashMap::new(),
            queued: Vec::new(),
            blocked_on: HashMap::new(),
            freed: HashSet::new(),
        }
    }

    /// Resolves a new emergency request against the live signal state.
    /// Invalid corridors are rejected here and never queued.
    pub fn submit(
        &mut self,
        mut request: EmergencyRequest,
        topology: &NetworkTopology,
        signals: &mut SignalController,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> CorridorDecision {
        if let Err(err) = validate_corridor(&request, topology, signals) {
            warn!("rejecting request {:?}: {}", request.id, err);
            request.reject_reason = Some(RejectReason::InvalidCorridor(err.to_string()));
            request.state = RequestState::Rejected;
            request.resolved_at = Some(now);
            events.push(EngineEvent::RequestStateChanged {
                request: request.id,
                old_state: RequestState::Pending,
                new_state: RequestState::Rejected,
                at: now,
            });
            self.requests.insert(request.id, request);
            return CorridorDecision::Rejected;
        }

        let id = request.id;
        self.requests.insert(id, request);
        if self.try_grant(id, signals, now, events) {
            CorridorDecision::Granted
        } else {
            info!("request {:?} queued behind a live override", id);
            self.queued.push(id);
            CorridorDecision::Queued
        }
    }

    /// Runs the per-tick resolution pass, after the signal machines
    /// have advanced: Granted requests whose corridor entry shows
    /// Green become Active, buffered clearances are applied, transit
    /// timeouts fire, and queued requests blocked on a touched
    /// intersection are retried. Clearance and timeout observed in the
    /// same tick resolve in favor of clearance.
    pub fn resolve_tick(
        &mut self,
        signals: &mut SignalController,
        now: u64,
        phase_changed: &HashSet<IntersectionId>,
        clearances: &[(RequestId, IntersectionId, u64)],
    ) -> Vec<EngineEvent> {
        let mut events = Vec::new();

        let mut granted: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| r.state == RequestState::Granted)
            .map(|r| r.id)
            .collect();
        granted.sort();
        for id in granted {
            self.maybe_activate(id, signals, now, &mut events);
        }

        for &(id, node, at) in clearances {
            self.apply_clearance(id, node, at, now, signals, &mut events);
        }

        let mut active: Vec<(RequestId, u64)> = self
            .requests
            .values()
            .filter(|r| r.state == RequestState::Active)
            .map(|r| (r.id, r.activated_at.unwrap_or(r.requested_at)))
            .collect();
        active.sort();
        for (id, activated_at) in active {
            if now.saturating_sub(activated_at) >= self.max_transit_s {
                warn!(
                    "request {:?} hit the {}s transit timeout, forcing completion",
                    id, self.max_transit_s
                );
                self.release_overrides_of(id, now, signals, &mut events);
                self.set_state(id, RequestState::Completed, now, &mut events);
                events.push(EngineEvent::Alert {
                    kind: AlertKind::TransitTimeout,
                    message: format!(
                        "no clearance within {}s; corridor overrides for request {:?} released",
                        self.max_transit_s, id
                    ),
                    request: Some(id),
                    zone: None,
                    at: now,
                });
            }
        }

        let mut touched: HashSet<IntersectionId> = phase_changed.clone();
        touched.extend(self.freed.drain());
        loop {
            let mut candidates: Vec<(Priority, u64, RequestId)> = self
                .queued
                .iter()
                .filter(|id| {
                    self.blocked_on
                        .get(*id)
                        .is_some_and(|blocked| !blocked.is_disjoint(&touched))
                })
                .filter_map(|id| self.requests.get(id))
                .map(|r| (r.priority, r.requested_at, r.id))
                .collect();
            if candidates.is_empty() {
                break;
            }
            // Highest priority first, then earliest request.
            candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
            let mut progress = false;
            for (_, _, id) in candidates {
                if self.try_grant(id, signals, now, &mut events) {
                    self.queued.retain(|q| *q != id);
                    progress = true;
                }
            }
            touched.extend(self.freed.drain());
            if !progress {
                break;
            }
        }

        events
    }

    fn try_grant(
        &mut self,
        id: RequestId,
        signals: &mut SignalController,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> bool {
        let Some(request) = self.requests.get(&id) else {
            return false;
        };
        let priority = request.priority;
        let requested_at = request.requested_at;
        let corridor = request.corridor.clone();

        let mut victims: Vec<RequestId> = Vec::new();
        let mut blockers: HashSet<IntersectionId> = HashSet::new();
        for &node in &corridor {
            let Some(&holder_id) = self.overrides.get(&node) else {
                continue;
            };
            if holder_id == id {
                continue;
            }
            let Some(holder) = self.requests.get(&holder_id) else {
                continue;
            };
            // Strictly lower priority is preempted. Critical also
            // preempts equal priority; Critical ties go to the
            // earliest requested_at, then the earlier id.
            let wins = priority > holder.priority
                || (priority == Priority::Critical
                    && holder.priority == Priority::Critical
                    && (requested_at, id) < (holder.requested_at, holder_id));
            if wins {
                if !victims.contains(&holder_id) {
                    victims.push(holder_id);
                }
            } else {
                blockers.insert(node);
            }
        }

        if !blockers.is_empty() {
            self.blocked_on.insert(id, blockers);
            return false;
        }

        for victim in victims {
            info!("request {:?} preempts {:?}", id, victim);
            self.release_overrides_of(victim, now, signals, events);
            if let Some(r) = self.requests.get_mut(&victim) {
                r.reject_reason = Some(RejectReason::PreemptedByHigherPriority);
            }
            self.set_state(victim, RequestState::Rejected, now, events);
        }

        for &node in &corridor {
            self.overrides.insert(node, id);
            signals.bind_override(node);
        }
        self.blocked_on.remove(&id);
        info!("corridor granted for request {:?}: {:?}", id, corridor);
        self.set_state(id, RequestState::Granted, now, events);
        self.maybe_activate(id, signals, now, events);
        true
    }

    fn maybe_activate(
        &mut self,
        id: RequestId,
        signals: &SignalController,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) {
        let first = match self.requests.get(&id) {
            Some(r) if r.state == RequestState::Granted => r.first_intersection(),
            _ => return,
        };
        let Some(first) = first else { return };
        if signals.phase_of(first) == Some(SignalPhase::Green) {
            if let Some(r) = self.requests.get_mut(&id) {
                r.activated_at = Some(now);
            }
            self.set_state(id, RequestState::Active, now, events);
        }
    }

    fn apply_clearance(
        &mut self,
        id: RequestId,
        node: IntersectionId,
        at: u64,
        now: u64,
        signals: &mut SignalController,
        events: &mut Vec<EngineEvent>,
    ) {
        let (state, last) = match self.requests.get(&id) {
            Some(r) => (r.state, r.last_intersection()),
            None => {
                warn!("clearance for unknown request {:?} ignored", id);
                return;
            }
        };
        if state != RequestState::Active {
            debug!(
                "clearance for request {:?} in state {:?} ignored",
                id, state
            );
            return;
        }
        if let Some(r) = self.requests.get_mut(&id) {
            r.cleared.insert(node);
        }
        debug!("request {:?} cleared {:?} at {}", id, node, at);
        if Some(node) == last {
            info!("request {:?} cleared its full corridor", id);
            self.release_overrides_of(id, now, signals, events);
            self.set_state(id, RequestState::Completed, now, events);
        }
    }

    fn release_overrides_of(
        &mut self,
        id: RequestId,
        now: u64,
        signals: &mut SignalController,
        events: &mut Vec<EngineEvent>,
    ) {
        let mut bound: Vec<IntersectionId> = self
            .overrides
            .iter()
            .filter(|(_, holder)| **holder == id)
            .map(|(node, _)| *node)
            .collect();
        bound.sort();
        for node in bound {
            self.overrides.remove(&node);
            if let Some(event) = signals.release_override(node, now) {
                events.push(event);
            }
            self.freed.insert(node);
        }
        self.queued.retain(|q| *q != id);
        self.blocked_on.remove(&id);
    }

    fn set_state(
        &mut self,
        id: RequestId,
        new_state: RequestState,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) {
        let Some(request) = self.requests.get_mut(&id) else {
            return;
        };
        let old_state = request.state;
        if old_state == new_state {
            return;
        }
        request.state = new_state;
        if new_state.is_terminal() {
            request.resolved_at = Some(now);
        }
        events.push(EngineEvent::RequestStateChanged {
            request: id,
            old_state,
            new_state,
            at: now,
        });
    }

    pub fn request(&self, id: RequestId) -> Option<&EmergencyRequest> {
        self.requests.get(&id)
    }

    pub fn override_holder(&self, node: IntersectionId) -> Option<RequestId> {
        self.overrides.get(&node).copied()
    }

    /// Requests that have not reached a terminal state, in id order.
    pub fn open_requests(&self) -> Vec<&EmergencyRequest> {
        let mut open: Vec<&EmergencyRequest> = self
            .requests
            .values()
            .filter(|r| !r.state.is_terminal())
            .collect();
        open.sort_by_key(|r| r.id);
        open
    }
}

fn validate_corridor(
    request: &EmergencyRequest,
    topology: &NetworkTopology,
    signals: &SignalController,
) -> Result<(), EngineError> {
    topology.validate_corridor(&request.corridor)?;
    for &node in &request.corridor {
        match signals.status_of(node) {
            Some(OperationalStatus::Active) => {}
            Some(status) => {
                return Err(EngineError::InvalidCorridor(format!(
                    "intersection {:?} is {:?} and cannot take an override",
                    node, status
                )))
            }
            None => {
                return Err(EngineError::InvalidCorridor(format!(
                    "intersection {:?} has no signal machine",
                    node
                )))
            }
        }
    }
    Ok(())
}
