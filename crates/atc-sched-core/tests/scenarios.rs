//! End-to-end scenarios for conflict detection and departure scheduling.

use atc_sched_core::{
    reduce_conflicts, run, AircraftState, ConflictEvent, ConflictKind, EngineConfig, EventWindow, FlightPhase,
    FlightPlan, ScheduleStatus, Waypoint,
};
use chrono::{TimeZone, Utc};

fn window() -> EventWindow {
    EventWindow::new(
        Utc.with_ymd_and_hms(2026, 5, 1, 14, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 5, 1, 17, 0, 0).unwrap(),
    )
    .unwrap()
}

fn straight(id: &str, origin: &str, destination: &str, from: (f64, f64), to: (f64, f64), altitude_ft: i32, duration_s: f64) -> FlightPlan {
    FlightPlan::new(
        id,
        origin,
        destination,
        vec![
            Waypoint::new(origin, from.0, from.1, altitude_ft, 0.0),
            Waypoint::new(destination, to.0, to.1, altitude_ft, duration_s),
        ],
    )
}

/// Departure climbing to 10,000 ft 30 nm out, heading `N`, `E` or `S`.
fn departure(id: &str, origin: &str, destination: &str, heading: char) -> FlightPlan {
    let (lat, lon) = (40.0, -75.0);
    let (climb, end) = match heading {
        'N' => ((40.5, -75.0), (41.5, -75.0)),
        'E' => ((40.0, -74.35), (40.0, -73.05)),
        _ => ((39.5, -75.0), (38.5, -75.0)),
    };
    FlightPlan::new(
        id,
        origin,
        destination,
        vec![
            Waypoint::new(origin, lat, lon, 0, 0.0).with_phase(FlightPhase::Climb),
            Waypoint::new(format!("{id}TOC"), climb.0, climb.1, 10000, 720.0),
            Waypoint::new(destination, end.0, end.1, 10000, 2160.0),
        ],
    )
}

#[test]
fn crossing_routes_yield_one_between_waypoints_conflict() {
    // East-west and south-north tracks crossing at 40N 75W, 30 seconds apart.
    let east = straight("AAL100", "KWWW", "KEEE", (40.0, -75.5), (40.0, -74.5), 10000, 1200.0);
    let north = straight("DAL200", "KSSS", "KNNN", (39.6, -75.0), (40.4, -75.0), 10000, 1260.0);

    let output = run(&[east, north], window(), &EngineConfig::default()).unwrap();

    assert_eq!(output.conflicts.first_conflicts.len(), 1);
    let event = &output.conflicts.first_conflicts[0];
    assert_eq!(event.kind, ConflictKind::BetweenWaypoints);
    assert_eq!(event.flight1.flight_id, "AAL100");
    assert_eq!(event.flight2.flight_id, "DAL200");
    assert!(event.lateral_nm < 3.0);
    assert!(event.vertical_ft < 900);
    assert!(event.nearest.is_some());
    assert!(output.conflicts.suppressed > 0);

    let canonical = &output.canonical;
    assert_eq!(canonical.metadata.total_flights, 2);
    assert_eq!(canonical.metadata.total_first_conflicts, 1);
    let schedule = &canonical.metadata.departure_schedule;
    assert_eq!(schedule.get("AAL100").unwrap().conflict_count, 1);
    assert_eq!(schedule.get("DAL200").unwrap().conflict_count, 1);
}

#[test]
fn three_departures_from_one_airport_are_two_minutes_apart() {
    let mut routes = vec![
        departure("N1", "KAAA", "KNNN", 'N'),
        departure("E1", "KAAA", "KEEE", 'E'),
        departure("S1", "KAAA", "KSSS", 'S'),
    ];
    routes[1].requested_offset_s = 60.0;
    routes[2].requested_offset_s = 120.0;

    let output = run(&routes, window(), &EngineConfig::default()).unwrap();
    assert!(output.conflicts.first_conflicts.is_empty());

    let schedule = &output.canonical.metadata.departure_schedule;
    let start = window().start;
    assert_eq!(schedule.get("N1").unwrap().departure, start);
    assert_eq!(schedule.get("E1").unwrap().departure, Utc.with_ymd_and_hms(2026, 5, 1, 14, 2, 0).unwrap());
    assert_eq!(schedule.get("S1").unwrap().departure, Utc.with_ymd_and_hms(2026, 5, 1, 14, 4, 0).unwrap());
    assert_eq!(schedule.get("E1").unwrap().status, ScheduleStatus::Adjusted);
}

#[test]
fn proximity_below_minimum_altitude_is_ignored() {
    let east = straight("LOW1", "KWWW", "KEEE", (40.0, -75.5), (40.0, -74.5), 3000, 1200.0);
    let north = straight("LOW2", "KSSS", "KNNN", (39.6, -75.0), (40.4, -75.0), 3000, 1260.0);

    let output = run(&[east, north], window(), &EngineConfig::default()).unwrap();
    assert!(output.conflicts.first_conflicts.is_empty());
    assert_eq!(output.canonical.metadata.total_first_conflicts, 0);
}

#[test]
fn rejected_route_does_not_stop_the_run() {
    let good = departure("N1", "KAAA", "KNNN", 'N');
    let mut bad = departure("BAD", "KAAA", "KEEE", 'E');
    bad.waypoints[1].elapsed_s = 3000.0;

    let output = run(&[good, bad], window(), &EngineConfig::default()).unwrap();
    assert_eq!(output.rejected.len(), 1);
    assert_eq!(output.rejected[0].flight_id(), "BAD");
    assert_eq!(output.canonical.metadata.total_flights, 1);
    assert!(output.canonical.flights.contains_key("N1"));
}

#[test]
fn conflict_inside_exempt_airport_radius_is_dropped() {
    let east = straight("AAL100", "KWWW", "KEEE", (40.0, -75.5), (40.0, -74.5), 10000, 1200.0);
    let north = straight("DAL200", "KSSS", "KNNN", (39.6, -75.0), (40.4, -75.0), 10000, 1260.0);

    let mut config = EngineConfig::default();
    config.exempt_airports.push(atc_sched_core::ExemptAirport {
        code: "KMID".into(),
        radius_nm: 10.0,
        lat: Some(40.0),
        lon: Some(-75.0),
    });

    let output = run(&[east, north], window(), &config).unwrap();
    assert!(output.conflicts.first_conflicts.is_empty());
}

fn candidate_at(lat: f64, lon: f64, time_s: f64) -> ConflictEvent {
    let state = |id: &str| AircraftState {
        flight_id: id.to_string(),
        lat,
        lon,
        altitude_ft: 12000,
        elapsed_s: time_s,
        phase: FlightPhase::Cruise,
        waypoint: None,
    };
    ConflictEvent {
        flight1: state("A"),
        flight2: state("B"),
        lateral_nm: 0.5,
        vertical_ft: 0,
        time_s,
        kind: ConflictKind::BetweenWaypoints,
        nearest: None,
    }
}

#[test]
fn duplicate_within_four_miles_is_dropped() {
    // One minute of latitude is one nautical mile.
    let reduced = reduce_conflicts(
        vec![
            candidate_at(40.0, -75.0, 100.0),
            candidate_at(40.0 + 2.0 / 60.0, -75.0, 120.0),
            candidate_at(40.0 + 4.5 / 60.0, -75.0, 140.0),
        ],
        4.0,
    );
    assert_eq!(reduced.first_conflicts.len(), 1);
    assert_eq!(reduced.first_conflicts[0].time_s, 100.0);
    assert_eq!(reduced.suppressed, 1);
    assert_eq!(reduced.secondary.len(), 1);
}
