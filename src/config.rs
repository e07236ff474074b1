use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::congestion::{CongestionThresholds, Zone, ZoneId};
use crate::errors::EngineError;
use crate::signal::intersection::{
    Intersection, IntersectionId, OperationalStatus, SignalTiming,
};

fn default_tick_interval_s() -> u64 {
    1
}

fn default_max_transit_s() -> u64 {
    300
}

fn default_alert_window_s() -> u64 {
    60
}

/// Engine configuration, loaded once at startup. Topology edits are a
/// full reconfiguration; nothing here is mutated live except the
/// per-intersection durations, which go through
/// `configure_intersection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_interval_s")]
    pub tick_interval_s: u64,
    pub thresholds: CongestionThresholds,
    /// Maximum transit window before an Active request is force-completed.
    #[serde(default = "default_max_transit_s")]
    pub max_transit_s: u64,
    /// How long an alert stays in the snapshot's active count.
    #[serde(default = "default_alert_window_s")]
    pub alert_window_s: u64,
    pub intersections: Vec<Intersection>,
    pub zones: Vec<Zone>,
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_interval_s == 0 {
            return Err(EngineError::InvalidConfiguration(
                "tick interval must be at least 1 second".to_string(),
            ));
        }
        if self.max_transit_s == 0 {
            return Err(EngineError::InvalidConfiguration(
                "max transit window must be positive".to_string(),
            ));
        }
        self.thresholds.validate()?;
        for intersection in &self.intersections {
            intersection.timing.validate().map_err(|e| {
                EngineError::InvalidConfiguration(format!(
                    "intersection '{}': {}",
                    intersection.name, e
                ))
            })?;
        }
        let mut zone_ids: Vec<ZoneId> = self.zones.iter().map(|z| z.id).collect();
        zone_ids.sort();
        zone_ids.dedup();
        if zone_ids.len() != self.zones.len() {
            return Err(EngineError::InvalidConfiguration(
                "duplicate zone id".to_string(),
            ));
        }
        // Duplicate intersection ids and unknown neighbors are caught
        // when the topology is built from this config.
        Ok(())
    }

    /// The built-in demonstration network: the four controlled
    /// junctions and five monitored zones of the city dashboard.
    pub fn demo() -> Self {
        let intersection = |id: u32,
                            name: &str,
                            x: f64,
                            y: f64,
                            status: OperationalStatus,
                            connected: &[u32]| Intersection {
            id: IntersectionId(id),
            name: name.to_string(),
            x,
            y,
            timing: SignalTiming { green_s: 45, red_s: 30 },
            status,
            connected: connected.iter().copied().map(IntersectionId).collect(),
        };
        let zone = |id: u32, name: &str, x: f64, y: f64| Zone {
            id: ZoneId(id),
            name: name.to_string(),
            x,
            y,
        };
        Self {
            tick_interval_s: 1,
            thresholds: CongestionThresholds {
                clear_max: 100,
                moderate_max: 200,
            },
            max_transit_s: 300,
            alert_window_s: 60,
            intersections: vec![
                intersection(1, "CBD Main Junction", 35.0, 40.0, OperationalStatus::Active, &[2]),
                intersection(2, "Airport Road Cross", 55.0, 35.0, OperationalStatus::Active, &[1, 3]),
                intersection(3, "Industrial Gate", 40.0, 65.0, OperationalStatus::Maintenance, &[2, 4]),
                intersection(4, "Highway Entry", 65.0, 60.0, OperationalStatus::Active, &[3]),
            ],
            zones: vec![
                zone(1, "CBD Central", 45.0, 30.0),
                zone(2, "Airport Road", 70.0, 50.0),
                zone(3, "Industrial Zone", 25.0, 70.0),
                zone(4, "Highway Junction", 60.0, 20.0),
                zone(5, "Residential Area", 80.0, 75.0),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_config_is_valid() {
        EngineConfig::demo().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_bound_timing() {
        let mut config = EngineConfig::demo();
        config.intersections[0].timing.green_s = 10;
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_duplicate_zone_ids() {
        let mut config = EngineConfig::demo();
        config.zones[1].id = config.zones[0].id;
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let config = EngineConfig::demo();
        let raw = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&raw).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.intersections.len(), 4);
        assert_eq!(parsed.zones.len(), 5);
    }
}
