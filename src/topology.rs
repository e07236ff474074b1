use std::collections::HashMap;

use crate::errors::EngineError;
use crate::signal::intersection::{Intersection, IntersectionId};

/// Static adjacency of the signal network. Built once from the
/// configuration and immutable for the engine's lifetime; topology
/// edits require a full reconfiguration.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    adjacency: HashMap<IntersectionId, Vec<IntersectionId>>,
}

impl NetworkTopology {
    pub fn from_intersections(intersections: &[Intersection]) -> Result<Self, EngineError> {
        let mut adjacency: HashMap<IntersectionId, Vec<IntersectionId>> = HashMap::new();
        for intersection in intersections {
            if adjacency
                .insert(intersection.id, intersection.connected.clone())
                .is_some()
            {
                return Err(EngineError::InvalidConfiguration(format!(
                    "duplicate intersection id {:?}",
                    intersection.id
                )));
            }
        }
        for intersection in intersections {
            for neighbor in &intersection.connected {
                if !adjacency.contains_key(neighbor) {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "intersection {:?} lists unknown neighbor {:?}",
                        intersection.id, neighbor
                    )));
                }
            }
        }
        Ok(Self { adjacency })
    }

    pub fn contains(&self, id: IntersectionId) -> bool {
        self.adjacency.contains_key(&id)
    }

    pub fn are_adjacent(&self, from: IntersectionId, to: IntersectionId) -> bool {
        self.adjacency
            .get(&from)
            .is_some_and(|neighbors| neighbors.contains(&to))
    }

    /// Checks that a corridor is a non-empty connected path of known
    /// intersections. Corridors arrive pre-computed from dispatch, so
    /// no route search happens here.
    pub fn validate_corridor(&self, corridor: &[IntersectionId]) -> Result<(), EngineError> {
        if corridor.is_empty() {
            return Err(EngineError::InvalidCorridor("corridor is empty".to_string()));
        }
        for id in corridor {
            if !self.contains(*id) {
                return Err(EngineError::InvalidCorridor(format!(
                    "unknown intersection {:?}",
                    id
                )));
            }
        }
        for pair in corridor.windows(2) {
            if !self.are_adjacent(pair[0], pair[1]) {
                return Err(EngineError::InvalidCorridor(format!(
                    "{:?} and {:?} are not adjacent",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::intersection::{OperationalStatus, SignalTiming};

    fn intersection(id: u32, connected: Vec<u32>) -> Intersection {
        Intersection {
            id: IntersectionId(id),
            name: format!("Intersection {}", id),
            x: 0.0,
            y: 0.0,
            timing: SignalTiming { green_s: 45, red_s: 30 },
            status: OperationalStatus::Active,
            connected: connected.into_iter().map(IntersectionId).collect(),
        }
    }

    fn line_topology() -> NetworkTopology {
        NetworkTopology::from_intersections(&[
            intersection(1, vec![2]),
            intersection(2, vec![1, 3]),
            intersection(3, vec![2]),
        ])
        .unwrap()
    }

    #[test]
    fn accepts_connected_corridor() {
        let topology = line_topology();
        let corridor = [IntersectionId(1), IntersectionId(2), IntersectionId(3)];
        assert!(topology.validate_corridor(&corridor).is_ok());
    }

    #[test]
    fn rejects_disconnected_corridor() {
        let topology = line_topology();
        let corridor = [IntersectionId(1), IntersectionId(3)];
        assert!(matches!(
            topology.validate_corridor(&corridor),
            Err(EngineError::InvalidCorridor(_))
        ));
    }

    #[test]
    fn rejects_unknown_intersection_and_empty_corridor() {
        let topology = line_topology();
        assert!(topology.validate_corridor(&[]).is_err());
        assert!(topology
            .validate_corridor(&[IntersectionId(1), IntersectionId(99)])
            .is_err());
    }

    #[test]
    fn rejects_unknown_neighbor_at_build_time() {
        let result = NetworkTopology::from_intersections(&[intersection(1, vec![42])]);
        assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
    }
}
