use log::debug;

use crate::signal::intersection::{
    Intersection, OperationalStatus, SignalPhase, SignalTiming, YELLOW_S,
};

/// Per-intersection phase cycle. Owns its intersection exclusively;
/// state changes only happen inside `tick` or through an override
/// bind/release issued by the preemption coordinator.
#[derive(Debug, Clone)]
pub struct SignalMachine {
    intersection: Intersection,
    phase: SignalPhase,
    elapsed_in_phase: u32,
    /// Reconfiguration waiting for the next Red -> Green boundary so an
    /// in-progress phase is never truncated.
    pending_timing: Option<SignalTiming>,
    overridden: bool,
}

impl SignalMachine {
    pub fn new(intersection: Intersection) -> Self {
        let phase = match intersection.status {
            OperationalStatus::Active => SignalPhase::Green,
            // Maintenance freezes at Red; Offline comes up at Red until
            // a reconfiguration brings it back.
            OperationalStatus::Maintenance | OperationalStatus::Offline => SignalPhase::Red,
        };
        Self {
            intersection,
            phase,
            elapsed_in_phase: 0,
            pending_timing: None,
            overridden: false,
        }
    }

    pub fn intersection(&self) -> &Intersection {
        &self.intersection
    }

    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    pub fn status(&self) -> OperationalStatus {
        self.intersection.status
    }

    pub fn timing(&self) -> SignalTiming {
        self.intersection.timing
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    fn current_phase_duration(&self) -> u32 {
        match self.phase {
            SignalPhase::Green => self.intersection.timing.green_s,
            SignalPhase::Yellow => YELLOW_S,
            SignalPhase::Red => self.intersection.timing.red_s,
        }
    }

    /// Advances the machine by one logical second. Returns the phase
    /// transition that occurred, if any.
    pub fn tick(&mut self) -> Option<(SignalPhase, SignalPhase)> {
        match self.intersection.status {
            OperationalStatus::Active => {}
            // Frozen: Maintenance holds Red, Offline holds its last phase.
            OperationalStatus::Maintenance | OperationalStatus::Offline => return None,
        }

        if self.overridden {
            // Held at forced Green for the corridor; the normal cycle is
            // suspended until the override is released.
            if self.phase != SignalPhase::Green {
                let old = self.phase;
                self.phase = SignalPhase::Green;
                self.elapsed_in_phase = 0;
                return Some((old, SignalPhase::Green));
            }
            return None;
        }

        self.elapsed_in_phase += 1;
        if self.elapsed_in_phase < self.current_phase_duration() {
            return None;
        }

        let old = self.phase;
        self.phase = match self.phase {
            SignalPhase::Green => SignalPhase::Yellow,
            SignalPhase::Yellow => SignalPhase::Red,
            SignalPhase::Red => SignalPhase::Green,
        };
        self.elapsed_in_phase = 0;

        if self.phase == SignalPhase::Green {
            if let Some(timing) = self.pending_timing.take() {
                debug!(
                    "intersection {:?} applying rescheduled timing {:?} at green boundary",
                    self.intersection.id, timing
                );
                self.intersection.timing = timing;
            }
        }

        Some((old, self.phase))
    }

    /// Stores new durations to be applied at the start of the next
    /// Green phase, never mid-phase.
    pub fn schedule_timing(&mut self, timing: SignalTiming) {
        self.pending_timing = Some(timing);
    }

    /// Suspends the normal cycle and holds Green for an emergency
    /// corridor. Returns false if the machine cannot accept an
    /// override (Maintenance or Offline).
    pub fn bind_override(&mut self) -> bool {
        if self.intersection.status != OperationalStatus::Active {
            return false;
        }
        self.overridden = true;
        true
    }

    /// Releases an override. The machine resumes from a fresh Red so a
    /// full red interval elapses before ordinary timing returns; it
    /// never resumes mid-cycle. Returns the transition if the phase
    /// changed.
    pub fn release_override(&mut self) -> Option<(SignalPhase, SignalPhase)> {
        self.overridden = false;
        self.elapsed_in_phase = 0;
        if self.phase != SignalPhase::Red {
            let old = self.phase;
            self.phase = SignalPhase::Red;
            return Some((old, SignalPhase::Red));
        }
        None
    }
}
