//! Separation rules and engine thresholds.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub interpolation: InterpolationRules,
    pub separation: SeparationRules,
    pub schedule: ScheduleRules,
    /// Airports around which conflicts are ignored
    pub exempt_airports: Vec<ExemptAirport>,
    /// Scan flight pairs on the rayon pool
    pub parallel_scan: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationRules::default(),
            separation: SeparationRules::default(),
            schedule: ScheduleRules::default(),
            exempt_airports: Vec::new(),
            parallel_scan: true,
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("interpolation.spacing_nm", self.interpolation.spacing_nm),
            ("separation.lateral_nm", self.separation.lateral_nm),
            ("separation.vertical_ft", self.separation.vertical_ft),
            ("separation.duplicate_radius_nm", self.separation.duplicate_radius_nm),
            ("schedule.step_min", self.schedule.step_min),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }

        let non_negative = [
            ("separation.time_tolerance_s", self.separation.time_tolerance_s),
            ("schedule.airport_separation_min", self.schedule.airport_separation_min),
            ("schedule.route_separation_min", self.schedule.route_separation_min),
            ("schedule.tolerance_min", self.schedule.tolerance_min),
            ("schedule.window_min", self.schedule.window_min),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::InvalidConfig(format!("{name} must not be negative, got {value}")));
            }
        }

        if let Some(airport) = self.exempt_airports.iter().find(|a| !a.radius_nm.is_finite() || a.radius_nm < 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "exempt airport {} has invalid radius {}",
                airport.code, airport.radius_nm
            )));
        }

        Ok(())
    }
}

/// Route interpolation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationRules {
    /// Target spacing between synthetic points (nautical miles)
    pub spacing_nm: f64,
}

impl Default for InterpolationRules {
    fn default() -> Self {
        Self { spacing_nm: 2.0 }
    }
}

/// Conflict thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationRules {
    /// Minimum lateral separation (nautical miles)
    pub lateral_nm: f64,
    /// Minimum vertical separation (feet)
    pub vertical_ft: f64,
    /// Both aircraft must be above this altitude for a conflict to count (feet)
    pub min_altitude_ft: i32,
    /// How far apart in time two points may be and still count as simultaneous (seconds)
    pub time_tolerance_s: f64,
    /// Candidates closer than this to an accepted conflict of the same pair are duplicates (nautical miles)
    pub duplicate_radius_nm: f64,
}

impl Default for SeparationRules {
    fn default() -> Self {
        Self {
            lateral_nm: 3.0,
            vertical_ft: 900.0,
            min_altitude_ft: 5_000,
            time_tolerance_s: 60.0,
            duplicate_radius_nm: 4.0,
        }
    }
}

/// Departure separation and search parameters, in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleRules {
    /// Minimum gap between departures from the same origin
    pub airport_separation_min: f64,
    /// Minimum gap between flights with the same origin and destination
    pub route_separation_min: f64,
    /// A departure may slip this far past nominal without snapping to the step grid
    pub tolerance_min: f64,
    /// Increment used when searching past the tolerance
    pub step_min: f64,
    /// Latest departure searched, measured from event start
    pub window_min: f64,
}

impl Default for ScheduleRules {
    fn default() -> Self {
        Self {
            airport_separation_min: 2.0,
            route_separation_min: 5.0,
            tolerance_min: 2.0,
            step_min: 5.0,
            window_min: 120.0,
        }
    }
}

/// Airport whose surroundings are excluded from conflict detection.
///
/// When `lat`/`lon` are absent the position is taken from any route whose
/// origin or destination carries the same code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExemptAirport {
    pub code: String,
    pub radius_nm: f64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_minima() {
        let config = EngineConfig::default();
        assert_eq!(config.separation.lateral_nm, 3.0);
        assert_eq!(config.separation.vertical_ft, 900.0);
        assert_eq!(config.separation.min_altitude_ft, 5_000);
        assert_eq!(config.schedule.airport_separation_min, 2.0);
        assert_eq!(config.schedule.route_separation_min, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"separation": {"lateral_nm": 5.0}, "parallel_scan": false}"#).unwrap();
        assert_eq!(config.separation.lateral_nm, 5.0);
        assert_eq!(config.separation.vertical_ft, 900.0);
        assert_eq!(config.interpolation.spacing_nm, 2.0);
        assert!(!config.parallel_scan);
    }

    #[test]
    fn validate_rejects_zero_spacing() {
        let mut config = EngineConfig::default();
        config.interpolation.spacing_nm = 0.0;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }
}
