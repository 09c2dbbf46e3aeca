//! Route interpolation.
//!
//! Named waypoints can be tens of miles apart, so two routes can cross well
//! between fixes. Synthetic points are placed along every great-circle leg so
//! the scanner sees each aircraft at roughly fixed spatial intervals.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::RouteError;
use crate::models::{FlightPhase, FlightPlan, Waypoint};
use crate::rules::InterpolationRules;
use crate::spatial::{haversine_nm, intermediate_point};

/// Legs shorter than this are treated as zero length.
const DEGENERATE_LEG_NM: f64 = 1e-6;

/// Validated, interpolated routes plus the flights that were turned away.
#[derive(Debug, Clone, Default)]
pub struct PreparedRoutes {
    /// Interpolated routes ordered by flight id
    pub routes: Vec<FlightPlan>,
    pub rejected: Vec<RouteError>,
}

/// Validate and interpolate every route.
///
/// A rejected route is logged and dropped; the remaining flights continue.
/// The first occurrence of a flight id wins over later duplicates.
pub fn prepare_routes(plans: &[FlightPlan], rules: &InterpolationRules) -> PreparedRoutes {
    let mut seen = HashSet::new();
    let mut prepared = PreparedRoutes::default();

    for plan in plans {
        if let Err(err) = plan.validate() {
            tracing::warn!(flight_id = %plan.flight_id, "Rejected route: {err}");
            prepared.rejected.push(err);
            continue;
        }
        if !seen.insert(plan.flight_id.as_str()) {
            let err = RouteError::Duplicate {
                flight_id: plan.flight_id.clone(),
            };
            tracing::warn!(flight_id = %plan.flight_id, "Rejected route: {err}");
            prepared.rejected.push(err);
            continue;
        }

        let route = interpolate_route(plan, rules.spacing_nm);
        tracing::debug!(
            flight_id = %route.flight_id,
            original = plan.waypoints.len(),
            total = route.waypoints.len(),
            "Interpolated route"
        );
        prepared.routes.push(route);
    }

    prepared.routes.sort_by(|a, b| a.flight_id.cmp(&b.flight_id));
    prepared
}

/// Insert synthetic points along each leg at about `spacing_nm` apart.
///
/// Expects a route that passed [`FlightPlan::validate`]. Original points are
/// tagged from the phase markers, inferred when absent. Altitude and elapsed
/// time are interpolated by great-circle distance fraction. Legs no longer
/// than the spacing get no synthetic points and zero-length legs are skipped.
pub fn interpolate_route(plan: &FlightPlan, spacing_nm: f64) -> FlightPlan {
    let mut source = plan.clone();
    source.infer_phase_markers();
    let phases: Vec<FlightPhase> = (0..source.waypoints.len()).map(|i| source.phase_for_index(i)).collect();
    for (waypoint, phase) in source.waypoints.iter_mut().zip(phases) {
        waypoint.phase = phase;
    }

    let originals = &source.waypoints;
    let mut points: Vec<Waypoint> = Vec::with_capacity(originals.len());
    let mut positions: Vec<usize> = Vec::with_capacity(originals.len());

    if let Some(first) = originals.first() {
        positions.push(points.len());
        points.push(Waypoint {
            interpolated: false,
            ..first.clone()
        });
    }

    for (index, leg) in originals.windows(2).enumerate() {
        let (from, to) = (&leg[0], &leg[1]);
        let leg_nm = haversine_nm(from.lat, from.lon, to.lat, to.lon);

        if leg_nm > DEGENERATE_LEG_NM && spacing_nm > 0.0 {
            let phase = synthetic_phase(&source, index, to.phase);
            let count = ((leg_nm / spacing_nm).ceil() as usize).saturating_sub(1);
            for step in 1..=count {
                let fraction = step as f64 / (count + 1) as f64;
                points.push(synthetic_point(from, to, fraction, phase));
            }
        }

        positions.push(points.len());
        points.push(Waypoint {
            interpolated: false,
            ..to.clone()
        });
    }

    // Already in order for a validated route; the stable sort keeps ties in route order.
    points.sort_by(|a, b| a.elapsed_s.partial_cmp(&b.elapsed_s).unwrap_or(Ordering::Equal));

    FlightPlan {
        waypoints: points,
        top_of_climb: source.top_of_climb.and_then(|i| positions.get(i).copied()),
        top_of_descent: source.top_of_descent.and_then(|i| positions.get(i).copied()),
        ..source
    }
}

/// Phase for synthetic points on the leg starting at original index `leg_start`.
///
/// Points strictly between top of climb and top of descent are cruise;
/// elsewhere they take the destination-side tag.
fn synthetic_phase(plan: &FlightPlan, leg_start: usize, destination_phase: FlightPhase) -> FlightPhase {
    let after_climb = plan.top_of_climb.is_some_and(|toc| leg_start >= toc);
    let before_descent = plan.top_of_descent.is_some_and(|tod| leg_start < tod);
    if after_climb && before_descent {
        FlightPhase::Cruise
    } else {
        destination_phase
    }
}

fn synthetic_point(from: &Waypoint, to: &Waypoint, fraction: f64, phase: FlightPhase) -> Waypoint {
    let (lat, lon) = intermediate_point(from.lat, from.lon, to.lat, to.lon, fraction);
    let altitude = f64::from(from.altitude_ft) + f64::from(to.altitude_ft - from.altitude_ft) * fraction;
    Waypoint {
        name: String::new(),
        lat,
        lon,
        altitude_ft: altitude.round() as i32,
        elapsed_s: from.elapsed_s + (to.elapsed_s - from.elapsed_s) * fraction,
        phase,
        interpolated: true,
    }
}
