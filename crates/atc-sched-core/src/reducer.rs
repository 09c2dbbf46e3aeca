//! First-conflict reduction.
//!
//! The scanner reports every pair of points that violate separation, so one
//! crossing shows up as a run of candidates. Per aircraft pair only the
//! earliest candidate survives as the first conflict. The remaining candidates
//! are then compared against accepted locations: those within the duplicate
//! radius belong to a crossing already reported and are dropped, the rest are
//! kept as secondary crossings for information only.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictEvent;
use crate::spatial::haversine_nm;

/// Output of the reducer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReducedConflicts {
    /// At most one event per unordered flight pair, ordered by time then pair
    pub first_conflicts: Vec<ConflictEvent>,
    /// Distinct later crossings of pairs that already have a first conflict
    pub secondary: Vec<ConflictEvent>,
    /// Candidates dropped as repeats of an accepted crossing
    pub suppressed: usize,
}

impl ReducedConflicts {
    /// Number of first conflicts each flight takes part in.
    pub fn conflict_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.first_conflicts {
            *counts.entry(event.flight1.flight_id.clone()).or_insert(0) += 1;
            *counts.entry(event.flight2.flight_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// First conflicts a given flight takes part in.
    pub fn for_flight<'a>(&'a self, flight_id: &'a str) -> impl Iterator<Item = &'a ConflictEvent> + 'a {
        self.first_conflicts.iter().filter(move |event| event.involves(flight_id))
    }
}

/// Rank candidates of one pair: earliest first, then tightest, then scan order.
fn rank(a: &ConflictEvent, b: &ConflictEvent) -> Ordering {
    a.time_s
        .total_cmp(&b.time_s)
        .then_with(|| a.lateral_nm.total_cmp(&b.lateral_nm))
        .then_with(|| a.vertical_ft.cmp(&b.vertical_ft))
}

/// Collapse raw candidates to one first conflict per flight pair.
pub fn reduce_conflicts(candidates: Vec<ConflictEvent>, duplicate_radius_nm: f64) -> ReducedConflicts {
    let mut by_pair: BTreeMap<(String, String), Vec<ConflictEvent>> = BTreeMap::new();
    for event in candidates {
        by_pair.entry(event.pair_key()).or_default().push(event);
    }

    let mut reduced = ReducedConflicts::default();

    for (_, mut events) in by_pair {
        // Stable: equal-ranked candidates keep their scan order.
        events.sort_by(rank);
        let mut events = events.into_iter();
        let Some(winner) = events.next() else {
            continue;
        };

        let mut accepted = vec![winner.location()];
        for event in events {
            let (lat, lon) = event.location();
            let repeat = accepted
                .iter()
                .any(|&(a_lat, a_lon)| haversine_nm(a_lat, a_lon, lat, lon) < duplicate_radius_nm);
            if repeat {
                reduced.suppressed += 1;
            } else {
                accepted.push((lat, lon));
                reduced.secondary.push(event);
            }
        }

        reduced.first_conflicts.push(winner);
    }

    reduced.first_conflicts.sort_by(|a, b| {
        a.time_s
            .total_cmp(&b.time_s)
            .then_with(|| a.pair_key().cmp(&b.pair_key()))
    });

    tracing::debug!(
        first = reduced.first_conflicts.len(),
        secondary = reduced.secondary.len(),
        suppressed = reduced.suppressed,
        "Reduced conflict candidates"
    );
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{AircraftState, ConflictKind};
    use crate::models::FlightPhase;
    use crate::spatial::{offset_by_bearing, METERS_PER_NM};

    const BASE: (f64, f64) = (40.0, -75.0);

    fn state(id: &str, lat: f64, lon: f64, elapsed_s: f64) -> AircraftState {
        AircraftState {
            flight_id: id.to_string(),
            lat,
            lon,
            altitude_ft: 10000,
            elapsed_s,
            phase: FlightPhase::Cruise,
            waypoint: None,
        }
    }

    /// Candidate for `pair` located `east_nm` east of the base point.
    fn candidate(pair: (&str, &str), east_nm: f64, time_s: f64) -> ConflictEvent {
        let (lat, lon) = offset_by_bearing(BASE.0, BASE.1, east_nm * METERS_PER_NM, std::f64::consts::FRAC_PI_2);
        ConflictEvent {
            flight1: state(pair.0, lat, lon, time_s),
            flight2: state(pair.1, lat, lon, time_s),
            lateral_nm: 1.0,
            vertical_ft: 0,
            time_s,
            kind: ConflictKind::BetweenWaypoints,
            nearest: None,
        }
    }

    #[test]
    fn keeps_earliest_candidate_per_pair() {
        let candidates = vec![
            candidate(("A", "B"), 0.5, 300.0),
            candidate(("A", "B"), 0.0, 240.0),
            candidate(("A", "C"), 20.0, 100.0),
            candidate(("B", "C"), 40.0, 500.0),
        ];
        let reduced = reduce_conflicts(candidates, 4.0);

        assert_eq!(reduced.first_conflicts.len(), 3);
        let ab = reduced
            .first_conflicts
            .iter()
            .find(|e| e.pair_key() == ("A".to_string(), "B".to_string()))
            .unwrap();
        assert_eq!(ab.time_s, 240.0);
        assert_eq!(reduced.first_conflicts[0].pair_key(), ("A".to_string(), "C".to_string()));
    }

    #[test]
    fn nearby_repeat_is_suppressed_and_distant_crossing_kept_as_secondary() {
        let candidates = vec![
            candidate(("A", "B"), 0.0, 100.0),
            candidate(("A", "B"), 2.0, 130.0),
            candidate(("A", "B"), 4.5, 160.0),
        ];
        let reduced = reduce_conflicts(candidates, 4.0);

        assert_eq!(reduced.first_conflicts.len(), 1);
        assert_eq!(reduced.first_conflicts[0].time_s, 100.0);
        assert_eq!(reduced.suppressed, 1);
        assert_eq!(reduced.secondary.len(), 1);
        assert_eq!(reduced.secondary[0].time_s, 160.0);
    }

    #[test]
    fn conflict_counts_cover_both_sides() {
        let reduced = reduce_conflicts(
            vec![
                candidate(("A", "B"), 0.0, 100.0),
                candidate(("A", "C"), 10.0, 200.0),
            ],
            4.0,
        );
        let counts = reduced.conflict_counts();
        assert_eq!(counts["A"], 2);
        assert_eq!(counts["B"], 1);
        assert_eq!(counts["C"], 1);
        assert_eq!(reduced.for_flight("C").count(), 1);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let reduced = reduce_conflicts(Vec::new(), 4.0);
        assert!(reduced.first_conflicts.is_empty());
        assert_eq!(reduced.suppressed, 0);
    }
}
