use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::signal::intersection::IntersectionId;

/// A unique identifier for an emergency request, assigned by the
/// engine in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyVehicle {
    Ambulance,
    Fire,
    Police,
}

/// Ordering matters: a later variant outranks an earlier one when
/// competing for an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Pending,
    Granted,
    Active,
    Completed,
    Rejected,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Rejected)
    }
}

/// Why a request ended in Rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    InvalidCorridor(String),
    PreemptedByHigherPriority,
}

/// An emergency corridor claim. Owned by the preemption coordinator
/// from submission until a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub id: RequestId,
    pub vehicle: EmergencyVehicle,
    pub priority: Priority,
    /// Ordered path of intersections the vehicle will traverse.
    pub corridor: Vec<IntersectionId>,
    pub state: RequestState,
    pub requested_at: u64,
    pub activated_at: Option<u64>,
    pub resolved_at: Option<u64>,
    pub reject_reason: Option<RejectReason>,
    /// Intersections the vehicle has already cleared.
    pub cleared: HashSet<IntersectionId>,
}

impl EmergencyRequest {
    pub fn new(
        id: RequestId,
        vehicle: EmergencyVehicle,
        priority: Priority,
        corridor: Vec<IntersectionId>,
        requested_at: u64,
    ) -> Self {
        Self {
            id,
            vehicle,
            priority,
            corridor,
            state: RequestState::Pending,
            requested_at,
            activated_at: None,
            resolved_at: None,
            reject_reason: None,
            cleared: HashSet::new(),
        }
    }

    pub fn first_intersection(&self) -> Option<IntersectionId> {
        self.corridor.first().copied()
    }

    pub fn last_intersection(&self) -> Option<IntersectionId> {
        self.corridor.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_puts_critical_on_top() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
    }

    #[test]
    fn terminal_states() {
        assert!(RequestState::Completed.is_terminal());
        assert!(RequestState::Rejected.is_terminal());
        assert!(!RequestState::Active.is_terminal());
        assert!(!RequestState::Pending.is_terminal());
    }
}
