//! Core data models for routes and event windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, RouteError};

/// Flight phase at a point along a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightPhase {
    Climb,
    #[default]
    Cruise,
    Descent,
}

impl std::fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FlightPhase::Climb => "climb",
            FlightPhase::Cruise => "cruise",
            FlightPhase::Descent => "descent",
        };
        f.write_str(label)
    }
}

/// A point along a route, either named (from the filed route) or synthetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Fix or airport identifier. Empty for synthetic points.
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(alias = "alt")]
    pub altitude_ft: i32,
    /// Seconds since departure
    #[serde(alias = "time_s")]
    pub elapsed_s: f64,
    #[serde(default)]
    pub phase: FlightPhase,
    /// True for points inserted by the route interpolator
    #[serde(default)]
    pub interpolated: bool,
}

impl Waypoint {
    /// Create an original (named) waypoint tagged as cruise.
    ///
    /// The interpolator retags original points from the route's phase markers.
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, altitude_ft: i32, elapsed_s: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            altitude_ft,
            elapsed_s,
            phase: FlightPhase::Cruise,
            interpolated: false,
        }
    }

    pub fn with_phase(mut self, phase: FlightPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Original waypoint carrying a usable name.
    pub fn is_named(&self) -> bool {
        !self.interpolated && !self.name.is_empty()
    }
}

/// A filed route for one flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPlan {
    pub flight_id: String,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub aircraft_type: String,
    pub waypoints: Vec<Waypoint>,
    /// Index of the top-of-climb point within `waypoints`
    #[serde(default)]
    pub top_of_climb: Option<usize>,
    /// Index of the top-of-descent point within `waypoints`
    #[serde(default)]
    pub top_of_descent: Option<usize>,
    /// Intended departure offset from event start, in seconds
    #[serde(default)]
    pub requested_offset_s: f64,
}

impl FlightPlan {
    pub fn new(
        flight_id: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        waypoints: Vec<Waypoint>,
    ) -> Self {
        Self {
            flight_id: flight_id.into(),
            origin: origin.into(),
            destination: destination.into(),
            aircraft_type: String::new(),
            waypoints,
            top_of_climb: None,
            top_of_descent: None,
            requested_offset_s: 0.0,
        }
    }

    /// Route duration in seconds (elapsed time of the destination point).
    pub fn duration_s(&self) -> f64 {
        self.waypoints.last().map(|wp| wp.elapsed_s).unwrap_or(0.0)
    }

    pub fn origin_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn destination_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// Original waypoints only, in route order.
    pub fn original_waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter().filter(|wp| !wp.interpolated)
    }

    /// Check the route is usable before interpolation.
    pub fn validate(&self) -> Result<(), RouteError> {
        let flight_id = || self.flight_id.clone();

        if self.waypoints.is_empty() {
            return Err(RouteError::Empty { flight_id: flight_id() });
        }
        if self.waypoints.len() < 2 {
            return Err(RouteError::TooFewWaypoints {
                flight_id: flight_id(),
                count: self.waypoints.len(),
            });
        }

        for (index, wp) in self.waypoints.iter().enumerate() {
            if !(wp.lat.is_finite() && wp.lon.is_finite() && wp.elapsed_s.is_finite()) {
                return Err(RouteError::NonFinite { flight_id: flight_id(), index });
            }
        }

        let first = &self.waypoints[0];
        if first.elapsed_s != 0.0 {
            return Err(RouteError::StartNotAtZero {
                flight_id: flight_id(),
                elapsed_s: first.elapsed_s,
            });
        }

        for (index, pair) in self.waypoints.windows(2).enumerate() {
            if pair[1].elapsed_s < pair[0].elapsed_s {
                return Err(RouteError::NonMonotonicTime {
                    flight_id: flight_id(),
                    index: index + 1,
                    previous_s: pair[0].elapsed_s,
                    elapsed_s: pair[1].elapsed_s,
                });
            }
        }

        let last = self.waypoints.len() - 1;
        if let Some(toc) = self.top_of_climb {
            if toc > last {
                return Err(RouteError::PhaseMarker {
                    flight_id: flight_id(),
                    marker: "top_of_climb",
                    index: toc,
                });
            }
        }
        if let Some(tod) = self.top_of_descent {
            let before_climb = self.top_of_climb.is_some_and(|toc| tod < toc);
            if tod > last || before_climb {
                return Err(RouteError::PhaseMarker {
                    flight_id: flight_id(),
                    marker: "top_of_descent",
                    index: tod,
                });
            }
        }

        Ok(())
    }

    /// Fill in missing top-of-climb / top-of-descent markers.
    ///
    /// Top of climb is the first point at the route's maximum altitude and top
    /// of descent the last one.
    pub fn infer_phase_markers(&mut self) {
        let Some(max_alt) = self.waypoints.iter().map(|wp| wp.altitude_ft).max() else {
            return;
        };
        if self.top_of_climb.is_none() {
            self.top_of_climb = self.waypoints.iter().position(|wp| wp.altitude_ft == max_alt);
        }
        if self.top_of_descent.is_none() {
            self.top_of_descent = self.waypoints.iter().rposition(|wp| wp.altitude_ft == max_alt);
        }
    }

    /// Phase implied by the markers for an original waypoint index.
    ///
    /// Top of climb closes the climb and top of descent is the last cruise point.
    pub fn phase_for_index(&self, index: usize) -> FlightPhase {
        match (self.top_of_climb, self.top_of_descent) {
            (Some(toc), _) if toc > 0 && index <= toc => FlightPhase::Climb,
            (_, Some(tod)) if index > tod => FlightPhase::Descent,
            _ => FlightPhase::Cruise,
        }
    }
}

/// Clock window of the event the schedule is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EngineError> {
        if end <= start {
            return Err(EngineError::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn duration_s(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// Absolute time `offset_s` seconds after the event start.
    pub fn at_offset(&self, offset_s: f64) -> DateTime<Utc> {
        self.start + Duration::milliseconds((offset_s * 1000.0).round() as i64)
    }

    /// Seconds from the event start to `time`.
    pub fn offset_of(&self, time: DateTime<Utc>) -> f64 {
        (time - self.start).num_milliseconds() as f64 / 1000.0
    }
}
