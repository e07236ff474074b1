use std::collections::BTreeMap;

use crate::shared_data::EngineEvent;
use crate::signal::intersection::{Intersection, IntersectionId, OperationalStatus, SignalPhase, SignalTiming};
use crate::signal::state_machine::SignalMachine;

/// Holds one state machine per configured intersection and fans ticks
/// out to all of them. Iteration order is fixed by id so event order
/// within a tick is deterministic and replayable.
pub struct SignalController {
    machines: BTreeMap<IntersectionId, SignalMachine>,
}

impl SignalController {
    pub fn new(intersections: Vec<Intersection>) -> Self {
        let mut machines = BTreeMap::new();
        for intersection in intersections {
            machines.insert(intersection.id, SignalMachine::new(intersection));
        }
        Self { machines }
    }

    /// Advances every machine by one logical second and collects the
    /// emitted phase-change events. Machines are independent; a frozen
    /// or overridden intersection never stalls the others.
    pub fn tick_all(&mut self, now: u64) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        for machine in self.machines.values_mut() {
            if let Some((old_phase, new_phase)) = machine.tick() {
                events.push(EngineEvent::PhaseChanged {
                    intersection: machine.intersection().id,
                    old_phase,
                    new_phase,
                    at: now,
                });
            }
        }
        events
    }

    pub fn contains(&self, id: IntersectionId) -> bool {
        self.machines.contains_key(&id)
    }

    pub fn phase_of(&self, id: IntersectionId) -> Option<SignalPhase> {
        self.machines.get(&id).map(|m| m.phase())
    }

    pub fn status_of(&self, id: IntersectionId) -> Option<OperationalStatus> {
        self.machines.get(&id).map(|m| m.status())
    }

    pub fn is_overridden(&self, id: IntersectionId) -> bool {
        self.machines.get(&id).is_some_and(|m| m.is_overridden())
    }

    /// Binds a corridor override. Returns false for unknown or
    /// non-Active intersections; the forced Green is taken up on the
    /// machine's next tick.
    pub fn bind_override(&mut self, id: IntersectionId) -> bool {
        self.machines
            .get_mut(&id)
            .is_some_and(|m| m.bind_override())
    }

    /// Releases an override and returns the phase event for the forced
    /// drop back to Red, if one occurred.
    pub fn release_override(&mut self, id: IntersectionId, now: u64) -> Option<EngineEvent> {
        let machine = self.machines.get_mut(&id)?;
        machine
            .release_override()
            .map(|(old_phase, new_phase)| EngineEvent::PhaseChanged {
                intersection: id,
                old_phase,
                new_phase,
                at: now,
            })
    }

    pub fn schedule_timing(&mut self, id: IntersectionId, timing: SignalTiming) -> bool {
        match self.machines.get_mut(&id) {
            Some(machine) => {
                machine.schedule_timing(timing);
                true
            }
            None => false,
        }
    }

    pub fn operating_count(&self) -> usize {
        self.machines
            .values()
            .filter(|m| m.status() == OperationalStatus::Active)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalMachine> {
        self.machines.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intersection(id: u32, status: OperationalStatus) -> Intersection {
        Intersection {
            id: IntersectionId(id),
            name: format!("Intersection {}", id),
            x: 0.0,
            y: 0.0,
            timing: SignalTiming { green_s: 20, red_s: 15 },
            status,
            connected: vec![],
        }
    }

    #[test]
    fn ticks_every_machine_independently() {
        let mut controller = SignalController::new(vec![
            intersection(1, OperationalStatus::Active),
            intersection(2, OperationalStatus::Active),
            intersection(3, OperationalStatus::Maintenance),
        ]);
        // Both active machines hit the green boundary on the same tick.
        let mut events = Vec::new();
        for now in 1..=20 {
            events.extend(controller.tick_all(now));
        }
        assert_eq!(events.len(), 2);
        assert_eq!(controller.phase_of(IntersectionId(3)), Some(SignalPhase::Red));
    }

    #[test]
    fn event_order_is_stable_by_id() {
        let mut controller = SignalController::new(vec![
            intersection(7, OperationalStatus::Active),
            intersection(2, OperationalStatus::Active),
        ]);
        let mut last = Vec::new();
        for now in 1..=20 {
            let events = controller.tick_all(now);
            if !events.is_empty() {
                last = events;
            }
        }
        let ids: Vec<_> = last
            .iter()
            .map(|e| match e {
                EngineEvent::PhaseChanged { intersection, .. } => intersection.0,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![2, 7]);
    }
}
