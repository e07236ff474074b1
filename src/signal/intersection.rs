use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// A unique identifier for an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntersectionId(pub u32);

/// Yellow is fixed network-wide; only green and red are operator-tunable.
pub const YELLOW_S: u32 = 5;

pub const GREEN_MIN_S: u32 = 20;
pub const GREEN_MAX_S: u32 = 120;
pub const RED_MIN_S: u32 = 15;
pub const RED_MAX_S: u32 = 90;

/// The current signal color state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalPhase {
    Green,
    Yellow,
    Red,
}

/// Operational status is orthogonal to the phase cycle:
/// - Active cycles normally.
/// - Maintenance is frozen at Red and rejects overrides.
/// - Offline is frozen at its last phase and emits no events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationalStatus {
    #[default]
    Active,
    Maintenance,
    Offline,
}

/// Configured green/red durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTiming {
    pub green_s: u32,
    pub red_s: u32,
}

impl SignalTiming {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.green_s < GREEN_MIN_S || self.green_s > GREEN_MAX_S {
            return Err(EngineError::InvalidConfiguration(format!(
                "green duration {}s outside [{}, {}]",
                self.green_s, GREEN_MIN_S, GREEN_MAX_S
            )));
        }
        if self.red_s < RED_MIN_S || self.red_s > RED_MAX_S {
            return Err(EngineError::InvalidConfiguration(format!(
                "red duration {}s outside [{}, {}]",
                self.red_s, RED_MIN_S, RED_MAX_S
            )));
        }
        Ok(())
    }

    /// Total cycle time including the fixed yellow interval.
    pub fn cycle_s(&self) -> u32 {
        self.green_s + YELLOW_S + self.red_s
    }
}

/// Represents a controlled junction with one traffic signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intersection {
    pub id: IntersectionId,
    pub name: String,
    /// Map anchor point, opaque to the engine.
    pub x: f64,
    pub y: f64,
    pub timing: SignalTiming,
    #[serde(default)]
    pub status: OperationalStatus,
    /// Adjacent intersections reachable from this one.
    pub connected: Vec<IntersectionId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_is_green_plus_yellow_plus_red() {
        for green_s in [GREEN_MIN_S, 45, GREEN_MAX_S] {
            for red_s in [RED_MIN_S, 30, RED_MAX_S] {
                let timing = SignalTiming { green_s, red_s };
                timing.validate().unwrap();
                assert_eq!(timing.cycle_s(), green_s + red_s + YELLOW_S);
            }
        }
    }

    #[test]
    fn rejects_out_of_bound_durations() {
        assert!(SignalTiming { green_s: 19, red_s: 30 }.validate().is_err());
        assert!(SignalTiming { green_s: 121, red_s: 30 }.validate().is_err());
        assert!(SignalTiming { green_s: 45, red_s: 14 }.validate().is_err());
        assert!(SignalTiming { green_s: 45, red_s: 91 }.validate().is_err());
    }
}
