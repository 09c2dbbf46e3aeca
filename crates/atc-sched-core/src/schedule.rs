//! Departure scheduling.
//!
//! Each flight gets a nominal departure: its requested offset from the event
//! start, delayed when needed so that it reaches its earliest first conflict
//! together with the partner aircraft. Flights are then placed greedily in
//! nominal order (ties by flight id), each at the earliest time that keeps
//! origin and origin-destination separation against flights already placed.
//! A flight never departs its origin ahead of one placed before it there, so
//! departures from an airport keep their nominal order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::DepartureOffsets;
use crate::models::{EventWindow, FlightPlan};
use crate::reducer::ReducedConflicts;
use crate::rules::ScheduleRules;

/// Slack for float comparisons on second offsets.
const EPSILON_S: f64 = 1e-6;

/// Grouping under which two departures need a minimum gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeparationRule {
    /// Same origin airport
    SameOrigin,
    /// Same origin and destination
    SameRoute,
}

/// How a departure relates to its nominal time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScheduleStatus {
    /// Departs at the nominal time
    Nominal,
    /// Moved later to keep separation, still inside the window
    Adjusted,
    /// No time inside the window keeps separation; placed at the earliest
    /// separated time past it
    Infeasible { blocking_rule: SeparationRule },
}

/// Scheduled departure for one flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub departure: DateTime<Utc>,
    /// Minutes after event start
    pub offset_min: f64,
    pub nominal: DateTime<Utc>,
    /// First conflicts this flight takes part in
    pub conflict_count: usize,
    #[serde(flatten)]
    pub status: ScheduleStatus,
}

impl ScheduleEntry {
    pub fn is_flagged(&self) -> bool {
        matches!(self.status, ScheduleStatus::Infeasible { .. })
    }
}

/// Departure time and conflict count per flight id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartureSchedule {
    pub entries: BTreeMap<String, ScheduleEntry>,
}

impl DepartureSchedule {
    pub fn get(&self, flight_id: &str) -> Option<&ScheduleEntry> {
        self.entries.get(flight_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Departure offsets from the event start, for a scan at absolute time.
    pub fn offsets(&self, window: &EventWindow) -> DepartureOffsets {
        self.entries
            .iter()
            .map(|(id, entry)| (id.clone(), window.offset_of(entry.departure)))
            .collect()
    }

    /// Flights that could not be separated inside the window.
    pub fn flagged(&self) -> impl Iterator<Item = (&String, &ScheduleEntry)> {
        self.entries.iter().filter(|(_, entry)| entry.is_flagged())
    }
}

/// Requested departure offsets from the event start, in seconds.
pub fn requested_offsets(routes: &[FlightPlan]) -> DepartureOffsets {
    routes
        .iter()
        .map(|route| (route.flight_id.clone(), route.requested_offset_s.max(0.0)))
        .collect()
}

/// Nominal departure offsets (seconds from event start) derived from the
/// requested offsets and each flight's earliest first conflict.
///
/// A flight that would reach its earliest conflict before its partner is
/// delayed by the difference, capped at `max_delay_s`. The partner's requested
/// offset is used as reference, so the result does not depend on any
/// processing order.
pub fn nominal_offsets(
    routes: &[FlightPlan],
    conflicts: &ReducedConflicts,
    max_delay_s: f64,
) -> BTreeMap<String, f64> {
    let requested = requested_offsets(routes);
    let requested_of = |id: &str| requested.get(id).copied().unwrap_or(0.0);

    routes
        .iter()
        .map(|route| {
            let own_base = requested_of(&route.flight_id);

            let earliest = conflicts
                .for_flight(&route.flight_id)
                .filter_map(|event| event.sides(&route.flight_id))
                .min_by(|(own_a, partner_a), (own_b, partner_b)| {
                    let time_a = (own_base + own_a.elapsed_s).min(requested_of(&partner_a.flight_id) + partner_a.elapsed_s);
                    let time_b = (own_base + own_b.elapsed_s).min(requested_of(&partner_b.flight_id) + partner_b.elapsed_s);
                    time_a
                        .total_cmp(&time_b)
                        .then_with(|| partner_a.flight_id.cmp(&partner_b.flight_id))
                });

            let delay = earliest
                .map(|(own, partner)| {
                    let partner_arrival = requested_of(&partner.flight_id) + partner.elapsed_s;
                    let own_arrival = own_base + own.elapsed_s;
                    (partner_arrival - own_arrival).clamp(0.0, max_delay_s.max(0.0))
                })
                .unwrap_or(0.0);

            (route.flight_id.clone(), (own_base + delay).round())
        })
        .collect()
}

/// Greedy departure scheduler.
#[derive(Debug, Clone, Default)]
pub struct DepartureScheduler {
    pub rules: ScheduleRules,
}

struct Placed<'a> {
    origin: &'a str,
    destination: &'a str,
    departure_s: f64,
}

impl DepartureScheduler {
    pub fn new(rules: ScheduleRules) -> Self {
        Self { rules }
    }

    /// Assign a departure to every route.
    ///
    /// Pure function of its inputs: identical routes, conflicts and window
    /// always give identical departures.
    pub fn schedule(
        &self,
        routes: &[FlightPlan],
        conflicts: &ReducedConflicts,
        window: &EventWindow,
    ) -> DepartureSchedule {
        let window_s = (self.rules.window_min * 60.0).min(window.duration_s());
        let nominal = nominal_offsets(routes, conflicts, window_s);
        let counts = conflicts.conflict_counts();

        let mut order: Vec<(&FlightPlan, f64)> = routes
            .iter()
            .map(|route| (route, nominal.get(&route.flight_id).copied().unwrap_or(0.0)))
            .collect();
        order.sort_by(|(a, nominal_a), (b, nominal_b)| {
            nominal_a
                .total_cmp(nominal_b)
                .then_with(|| a.flight_id.cmp(&b.flight_id))
        });

        let mut placed: Vec<Placed<'_>> = Vec::with_capacity(order.len());
        let mut schedule = DepartureSchedule::default();

        for (route, nominal_s) in order {
            let (departure_s, status) = self.place(route, nominal_s, window_s, &placed);

            match status {
                ScheduleStatus::Infeasible { blocking_rule } => tracing::warn!(
                    flight_id = %route.flight_id,
                    ?blocking_rule,
                    offset_min = departure_s / 60.0,
                    "No separated departure inside the scheduling window"
                ),
                ScheduleStatus::Adjusted => tracing::debug!(
                    flight_id = %route.flight_id,
                    nominal_min = nominal_s / 60.0,
                    offset_min = departure_s / 60.0,
                    "Departure moved for separation"
                ),
                ScheduleStatus::Nominal => {}
            }

            placed.push(Placed {
                origin: &route.origin,
                destination: &route.destination,
                departure_s,
            });
            schedule.entries.insert(
                route.flight_id.clone(),
                ScheduleEntry {
                    departure: window.at_offset(departure_s),
                    offset_min: departure_s / 60.0,
                    nominal: window.at_offset(nominal_s),
                    conflict_count: counts.get(&route.flight_id).copied().unwrap_or(0),
                    status,
                },
            );
        }

        schedule
    }

    fn place(&self, route: &FlightPlan, nominal_s: f64, window_s: f64, placed: &[Placed<'_>]) -> (f64, ScheduleStatus) {
        let tolerance_s = self.rules.tolerance_min * 60.0;
        let step_s = self.rules.step_min * 60.0;

        // No overtaking at the origin.
        let floor_s = placed
            .iter()
            .filter(|other| other.origin == route.origin)
            .map(|other| other.departure_s)
            .fold(nominal_s, f64::max);

        let earliest = self.earliest_separated(route, floor_s, placed);
        if earliest <= nominal_s + EPSILON_S {
            return (nominal_s, ScheduleStatus::Nominal);
        }
        if earliest - nominal_s <= tolerance_s + EPSILON_S && earliest <= window_s + EPSILON_S {
            return (earliest, ScheduleStatus::Adjusted);
        }

        // Past the tolerance, search on the step grid from nominal.
        if step_s > 0.0 {
            let mut candidate = nominal_s + step_s;
            while candidate <= window_s + EPSILON_S {
                if candidate >= earliest - EPSILON_S && self.violation(route, candidate, placed).is_none() {
                    return (candidate, ScheduleStatus::Adjusted);
                }
                candidate += step_s;
            }
        }

        if earliest <= window_s + EPSILON_S {
            return (earliest, ScheduleStatus::Adjusted);
        }

        let blocking_rule = self
            .violation(route, nominal_s, placed)
            .map(|(rule, _)| rule)
            .unwrap_or(SeparationRule::SameOrigin);
        (earliest, ScheduleStatus::Infeasible { blocking_rule })
    }

    /// Earliest time at or after `from_s` that is separated from every placed flight.
    fn earliest_separated(&self, route: &FlightPlan, from_s: f64, placed: &[Placed<'_>]) -> f64 {
        let mut time = from_s;
        // Each push lands just past a placed departure and time only grows,
        // so this ends after at most one push per placed flight.
        while let Some((_, clear_at)) = self.violation(route, time, placed) {
            time = clear_at;
        }
        time
    }

    /// Separation broken by departing at `time_s`, and the earliest time
    /// that clears it. The same-route rule is reported ahead of the airport rule.
    fn violation(&self, route: &FlightPlan, time_s: f64, placed: &[Placed<'_>]) -> Option<(SeparationRule, f64)> {
        let airport_gap = self.rules.airport_separation_min * 60.0;
        let route_gap = (self.rules.route_separation_min * 60.0).max(airport_gap);

        let mut worst: Option<(SeparationRule, f64)> = None;
        for other in placed {
            if other.origin != route.origin {
                continue;
            }
            let (rule, gap) = if other.destination == route.destination {
                (SeparationRule::SameRoute, route_gap)
            } else {
                (SeparationRule::SameOrigin, airport_gap)
            };
            if (time_s - other.departure_s).abs() + EPSILON_S >= gap {
                continue;
            }

            let clear_at = other.departure_s + gap;
            worst = match worst {
                None => Some((rule, clear_at)),
                Some((current_rule, current_clear)) => {
                    let rule = if current_rule == SeparationRule::SameRoute { current_rule } else { rule };
                    Some((rule, current_clear.max(clear_at)))
                }
            };
        }
        worst
    }
}
