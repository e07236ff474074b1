use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

/// Congestion classification for a monitored zone. Ordering follows
/// severity so bands compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CongestionBand {
    Clear,
    Moderate,
    Congested,
}

impl CongestionBand {
    /// Band weight on a 0-100 gauge, used for the network-wide average.
    pub fn score(&self) -> u32 {
        match self {
            CongestionBand::Clear => 0,
            CongestionBand::Moderate => 50,
            CongestionBand::Congested => 100,
        }
    }
}

/// Band boundaries, inclusive on the upper edge: a count equal to
/// `clear_max` is still Clear, one equal to `moderate_max` is still
/// Moderate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CongestionThresholds {
    pub clear_max: i64,
    pub moderate_max: i64,
}

impl CongestionThresholds {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.clear_max < 0 || self.clear_max >= self.moderate_max {
            return Err(EngineError::InvalidConfiguration(format!(
                "congestion thresholds must satisfy 0 <= clear_max < moderate_max, got {} / {}",
                self.clear_max, self.moderate_max
            )));
        }
        Ok(())
    }
}

/// Maps a raw vehicle count onto a band. Negative counts are sensor
/// noise and rejected so the zone keeps its last good classification;
/// the same goes for counts beyond what a zone reading can store.
pub fn classify(count: i64, thresholds: &CongestionThresholds) -> Result<CongestionBand, EngineError> {
    if count < 0 || count > u32::MAX as i64 {
        return Err(EngineError::TelemetryOutOfRange { count });
    }
    if count <= thresholds.clear_max {
        Ok(CongestionBand::Clear)
    } else if count <= thresholds.moderate_max {
        Ok(CongestionBand::Moderate)
    } else {
        Ok(CongestionBand::Congested)
    }
}

/// A monitored traffic zone. Static identity plus map position; live
/// readings are kept in `ZoneState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

/// The live reading for a zone: last accepted count and its band.
#[derive(Debug, Clone)]
pub struct ZoneState {
    pub zone: Zone,
    pub vehicle_count: u32,
    pub band: CongestionBand,
}

impl ZoneState {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            vehicle_count: 0,
            band: CongestionBand::Clear,
        }
    }

    /// Applies a new reading. On an out-of-range count the previous
    /// reading and band are retained and the error is returned.
    pub fn apply_count(
        &mut self,
        count: i64,
        thresholds: &CongestionThresholds,
    ) -> Result<(), EngineError> {
        let band = classify(count, thresholds)?;
        self.vehicle_count = count as u32;
        self.band = band;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: CongestionThresholds = CongestionThresholds {
        clear_max: 40,
        moderate_max: 70,
    };

    #[test]
    fn boundary_counts_stay_in_lower_band() {
        assert_eq!(classify(0, &THRESHOLDS).unwrap(), CongestionBand::Clear);
        assert_eq!(classify(40, &THRESHOLDS).unwrap(), CongestionBand::Clear);
        assert_eq!(classify(41, &THRESHOLDS).unwrap(), CongestionBand::Moderate);
        assert_eq!(classify(50, &THRESHOLDS).unwrap(), CongestionBand::Moderate);
        assert_eq!(classify(70, &THRESHOLDS).unwrap(), CongestionBand::Moderate);
        assert_eq!(classify(71, &THRESHOLDS).unwrap(), CongestionBand::Congested);
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(matches!(
            classify(-1, &THRESHOLDS),
            Err(EngineError::TelemetryOutOfRange { count: -1 })
        ));
    }

    #[test]
    fn oversized_counts_are_rejected_and_keep_state() {
        let too_big = u32::MAX as i64 + 1;
        assert!(matches!(
            classify(too_big, &THRESHOLDS),
            Err(EngineError::TelemetryOutOfRange { .. })
        ));
        assert_eq!(
            classify(u32::MAX as i64, &THRESHOLDS).unwrap(),
            CongestionBand::Congested
        );

        let mut state = ZoneState::new(Zone {
            id: ZoneId(1),
            name: "CBD Central".to_string(),
            x: 45.0,
            y: 30.0,
        });
        state.apply_count(80, &THRESHOLDS).unwrap();
        assert!(state.apply_count(too_big, &THRESHOLDS).is_err());
        assert_eq!(state.vehicle_count, 80);
        assert_eq!(state.band, CongestionBand::Congested);
    }

    #[test]
    fn classification_is_monotone_in_count() {
        let mut last = CongestionBand::Clear;
        for count in 0..200 {
            let band = classify(count, &THRESHOLDS).unwrap();
            assert!(band >= last);
            last = band;
        }
    }

    #[test]
    fn bad_reading_keeps_previous_band() {
        let mut state = ZoneState::new(Zone {
            id: ZoneId(1),
            name: "CBD Central".to_string(),
            x: 45.0,
            y: 30.0,
        });
        state.apply_count(80, &THRESHOLDS).unwrap();
        assert_eq!(state.band, CongestionBand::Congested);
        assert!(state.apply_count(-5, &THRESHOLDS).is_err());
        assert_eq!(state.vehicle_count, 80);
        assert_eq!(state.band, CongestionBand::Congested);
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let bad = CongestionThresholds {
            clear_max: 70,
            moderate_max: 40,
        };
        assert!(bad.validate().is_err());
        assert!(THRESHOLDS.validate().is_ok());
    }
}
