//! Pairwise conflict scanning.
//!
//! Every unordered pair of routes is walked point by point. Two points are
//! compared only when the aircraft are there at (nearly) the same time, so
//! each route's points are kept sorted by elapsed time and the partner route
//! is windowed with a binary search instead of a full cross product.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{FlightPhase, FlightPlan, Waypoint};
use crate::rules::{EngineConfig, ExemptAirport, SeparationRules};
use crate::spatial::{bearing_deg, compass_point, haversine_nm, midpoint};

/// Where along the routes a conflict was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    /// At least one aircraft is over a named filed waypoint
    AtWaypoint,
    /// Neither aircraft is over a named filed waypoint
    BetweenWaypoints,
}

/// One aircraft's state at the conflict instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    pub flight_id: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: i32,
    /// Seconds since this aircraft's departure
    pub elapsed_s: f64,
    pub phase: FlightPhase,
    /// Filed waypoint the aircraft is over, if any
    #[serde(default)]
    pub waypoint: Option<String>,
}

impl AircraftState {
    fn at(flight_id: &str, point: &Waypoint) -> Self {
        Self {
            flight_id: flight_id.to_string(),
            lat: point.lat,
            lon: point.lon,
            altitude_ft: point.altitude_ft,
            elapsed_s: point.elapsed_s,
            phase: point.phase,
            waypoint: point.is_named().then(|| point.name.clone()),
        }
    }
}

/// Closest filed waypoint to a between-waypoints conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestWaypoint {
    pub name: String,
    pub distance_nm: f64,
    /// Bearing from the waypoint to the conflict location, degrees true
    pub bearing_deg: f64,
}

/// A loss of separation between two flights.
///
/// `flight1` always carries the lexically smaller flight id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEvent {
    pub flight1: AircraftState,
    pub flight2: AircraftState,
    pub lateral_nm: f64,
    pub vertical_ft: i32,
    /// Earlier of the two aircraft's times at the conflict, seconds from the
    /// common reference (event start once departures are applied)
    pub time_s: f64,
    pub kind: ConflictKind,
    #[serde(default)]
    pub nearest: Option<NearestWaypoint>,
}

impl ConflictEvent {
    /// Sorted flight id pair identifying the aircraft pair.
    pub fn pair_key(&self) -> (String, String) {
        (self.flight1.flight_id.clone(), self.flight2.flight_id.clone())
    }

    pub fn involves(&self, flight_id: &str) -> bool {
        self.flight1.flight_id == flight_id || self.flight2.flight_id == flight_id
    }

    /// Midpoint between the two aircraft.
    pub fn location(&self) -> (f64, f64) {
        midpoint(self.flight1.lat, self.flight1.lon, self.flight2.lat, self.flight2.lon)
    }

    /// The state of `flight_id` and its partner, if the flight takes part.
    pub fn sides(&self, flight_id: &str) -> Option<(&AircraftState, &AircraftState)> {
        if self.flight1.flight_id == flight_id {
            Some((&self.flight1, &self.flight2))
        } else if self.flight2.flight_id == flight_id {
            Some((&self.flight2, &self.flight1))
        } else {
            None
        }
    }

    /// One-line description for briefings and logs.
    pub fn describe(&self) -> String {
        let place = match (&self.kind, &self.nearest) {
            (ConflictKind::AtWaypoint, _) => {
                let name = self
                    .flight1
                    .waypoint
                    .as_deref()
                    .or(self.flight2.waypoint.as_deref())
                    .unwrap_or("a filed waypoint");
                format!("over {name}")
            }
            (ConflictKind::BetweenWaypoints, Some(nearest)) => format!(
                "{:.1} nm {} of {}",
                nearest.distance_nm,
                compass_point(nearest.bearing_deg),
                nearest.name
            ),
            (ConflictKind::BetweenWaypoints, None) => "between waypoints".to_string(),
        };

        format!(
            "{} ({}, {} ft, T+{}) / {} ({}, {} ft, T+{}): {:.1} nm, {} ft apart, {}",
            self.flight1.flight_id,
            self.flight1.phase,
            self.flight1.altitude_ft,
            format_elapsed(self.flight1.elapsed_s),
            self.flight2.flight_id,
            self.flight2.phase,
            self.flight2.altitude_ft,
            format_elapsed(self.flight2.elapsed_s),
            self.lateral_nm,
            self.vertical_ft,
            place
        )
    }
}

fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Circle around an airport inside which conflicts are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExemptZone {
    pub code: String,
    pub lat: f64,
    pub lon: f64,
    pub radius_nm: f64,
}

impl ExemptZone {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        haversine_nm(self.lat, self.lon, lat, lon) <= self.radius_nm
    }
}

/// Resolve configured exempt airports to positions.
///
/// Airports without coordinates take them from the first route (by flight id)
/// that departs from or arrives at that code. Airports that cannot be placed
/// are logged and skipped.
pub fn resolve_exempt_zones(airports: &[ExemptAirport], routes: &[FlightPlan]) -> Vec<ExemptZone> {
    let mut sorted: Vec<&FlightPlan> = routes.iter().collect();
    sorted.sort_by(|a, b| a.flight_id.cmp(&b.flight_id));

    airports
        .iter()
        .filter_map(|airport| {
            let position = match (airport.lat, airport.lon) {
                (Some(lat), Some(lon)) => Some((lat, lon)),
                _ => sorted.iter().find_map(|route| airport_position(route, &airport.code)),
            };
            match position {
                Some((lat, lon)) => Some(ExemptZone {
                    code: airport.code.clone(),
                    lat,
                    lon,
                    radius_nm: airport.radius_nm,
                }),
                None => {
                    tracing::warn!(airport = %airport.code, "Exempt airport has no known position, ignoring");
                    None
                }
            }
        })
        .collect()
}

fn airport_position(route: &FlightPlan, code: &str) -> Option<(f64, f64)> {
    if route.origin == code {
        route.origin_waypoint().map(|wp| (wp.lat, wp.lon))
    } else if route.destination == code {
        route.destination_waypoint().map(|wp| (wp.lat, wp.lon))
    } else {
        None
    }
}

/// Departure offsets from the event start, in seconds, keyed by flight id.
/// Flights without an entry are treated as departing at offset zero.
pub type DepartureOffsets = HashMap<String, f64>;

/// Pairwise separation scanner.
#[derive(Debug, Clone)]
pub struct ConflictScanner {
    pub separation: SeparationRules,
    pub exempt_zones: Vec<ExemptZone>,
    /// Spread flight pairs over the rayon pool
    pub parallel: bool,
}

impl Default for ConflictScanner {
    fn default() -> Self {
        Self::new(SeparationRules::default())
    }
}

impl ConflictScanner {
    pub fn new(separation: SeparationRules) -> Self {
        Self {
            separation,
            exempt_zones: Vec::new(),
            parallel: false,
        }
    }

    /// Build a scanner from configuration, placing exempt airports using `routes`.
    pub fn from_config(config: &EngineConfig, routes: &[FlightPlan]) -> Self {
        Self {
            separation: config.separation.clone(),
            exempt_zones: resolve_exempt_zones(&config.exempt_airports, routes),
            parallel: config.parallel_scan,
        }
    }

    /// Scan with every flight departing at the same instant.
    pub fn scan_relative(&self, routes: &[FlightPlan]) -> Vec<ConflictEvent> {
        self.scan(routes, &DepartureOffsets::new())
    }

    /// Scan all unordered flight pairs, returning every raw candidate.
    ///
    /// Candidates come back grouped by pair in flight id order so the reducer
    /// sees the same sequence whether or not the scan ran in parallel.
    pub fn scan(&self, routes: &[FlightPlan], offsets: &DepartureOffsets) -> Vec<ConflictEvent> {
        let mut order: Vec<&FlightPlan> = routes.iter().collect();
        order.sort_by(|a, b| a.flight_id.cmp(&b.flight_id));

        let mut pairs = Vec::with_capacity(order.len() * order.len().saturating_sub(1) / 2);
        for i in 0..order.len() {
            for j in (i + 1)..order.len() {
                pairs.push((order[i], order[j]));
            }
        }

        let offset = |route: &FlightPlan| offsets.get(&route.flight_id).copied().unwrap_or(0.0);
        let scan_one = |&(a, b): &(&FlightPlan, &FlightPlan)| self.scan_pair(a, offset(a), b, offset(b));

        let per_pair: Vec<Vec<ConflictEvent>> = if self.parallel {
            pairs.par_iter().map(scan_one).collect()
        } else {
            pairs.iter().map(scan_one).collect()
        };

        let candidates: Vec<ConflictEvent> = per_pair.into_iter().flatten().collect();
        tracing::debug!(
            flights = order.len(),
            pairs = pairs.len(),
            candidates = candidates.len(),
            "Pairwise scan complete"
        );
        candidates
    }

    /// Every separation violation between two routes.
    ///
    /// The result does not depend on argument order.
    pub fn scan_pair(
        &self,
        route_a: &FlightPlan,
        offset_a: f64,
        route_b: &FlightPlan,
        offset_b: f64,
    ) -> Vec<ConflictEvent> {
        let ((first, first_offset), (second, second_offset)) = if route_a.flight_id <= route_b.flight_id {
            ((route_a, offset_a), (route_b, offset_b))
        } else {
            ((route_b, offset_b), (route_a, offset_a))
        };

        let rules = &self.separation;
        let tolerance = rules.time_tolerance_s;
        let mut events = Vec::new();

        for p in &first.waypoints {
            if p.altitude_ft <= rules.min_altitude_ft {
                continue;
            }
            let time_p = first_offset + p.elapsed_s;

            // Points outside the coincidence window are never compared.
            let start = second
                .waypoints
                .partition_point(|q| second_offset + q.elapsed_s < time_p - tolerance);

            for q in &second.waypoints[start..] {
                let time_q = second_offset + q.elapsed_s;
                if time_q > time_p + tolerance {
                    break;
                }
                if q.altitude_ft <= rules.min_altitude_ft {
                    continue;
                }

                let vertical_ft = (p.altitude_ft - q.altitude_ft).abs();
                if f64::from(vertical_ft) >= rules.vertical_ft {
                    continue;
                }
                let lateral_nm = haversine_nm(p.lat, p.lon, q.lat, q.lon);
                if lateral_nm >= rules.lateral_nm {
                    continue;
                }
                if self.is_exempt(p) || self.is_exempt(q) {
                    continue;
                }

                events.push(self.build_event(first, p, second, q, lateral_nm, vertical_ft, time_p.min(time_q)));
            }
        }

        events
    }

    fn is_exempt(&self, point: &Waypoint) -> bool {
        self.exempt_zones.iter().any(|zone| zone.contains(point.lat, point.lon))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_event(
        &self,
        route1: &FlightPlan,
        p: &Waypoint,
        route2: &FlightPlan,
        q: &Waypoint,
        lateral_nm: f64,
        vertical_ft: i32,
        time_s: f64,
    ) -> ConflictEvent {
        let flight1 = AircraftState::at(&route1.flight_id, p);
        let flight2 = AircraftState::at(&route2.flight_id, q);

        let (kind, nearest) = if p.is_named() || q.is_named() {
            (ConflictKind::AtWaypoint, None)
        } else {
            let (lat, lon) = midpoint(p.lat, p.lon, q.lat, q.lon);
            (ConflictKind::BetweenWaypoints, nearest_waypoint(lat, lon, [route1, route2]))
        };

        ConflictEvent {
            flight1,
            flight2,
            lateral_nm,
            vertical_ft,
            time_s,
            kind,
            nearest,
        }
    }
}

/// Closest named original waypoint on either route.
fn nearest_waypoint(lat: f64, lon: f64, routes: [&FlightPlan; 2]) -> Option<NearestWaypoint> {
    routes
        .into_iter()
        .flat_map(|route| route.waypoints.iter())
        .filter(|wp| wp.is_named())
        .map(|wp| (wp, haversine_nm(wp.lat, wp.lon, lat, lon)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(wp, distance_nm)| NearestWaypoint {
            name: wp.name.clone(),
            distance_nm,
            bearing_deg: bearing_deg(wp.lat, wp.lon, lat, lon),
        })
}
