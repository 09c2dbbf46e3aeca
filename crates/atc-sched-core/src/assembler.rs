//! Canonical plan assembly and publication.
//!
//! The canonical plan is the only artifact downstream consumers read: every
//! interpolated route keyed by flight id plus the schedule metadata. It is
//! verified before it is written, and written through a temporary sibling
//! file so a failed run never replaces the previous plan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{EventWindow, FlightPlan};
use crate::reducer::ReducedConflicts;
use crate::schedule::DepartureSchedule;

/// Summary block of the canonical plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub total_flights: usize,
    pub total_first_conflicts: usize,
    pub departure_schedule: DepartureSchedule,
}

/// Interpolated routes plus schedule metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPlan {
    pub flights: BTreeMap<String, FlightPlan>,
    pub metadata: PlanMetadata,
}

/// Merge routes and schedule into a verified canonical plan.
pub fn assemble(
    routes: Vec<FlightPlan>,
    schedule: DepartureSchedule,
    conflicts: &ReducedConflicts,
    window: &EventWindow,
) -> Result<CanonicalPlan, EngineError> {
    let mut flights = BTreeMap::new();
    for route in routes {
        let flight_id = route.flight_id.clone();
        if flights.insert(flight_id.clone(), route).is_some() {
            return Err(EngineError::Invariant(format!("flight {flight_id} appears twice")));
        }
    }

    let plan = CanonicalPlan {
        metadata: PlanMetadata {
            event_start: window.start,
            event_end: window.end,
            total_flights: flights.len(),
            total_first_conflicts: conflicts.first_conflicts.len(),
            departure_schedule: schedule,
        },
        flights,
    };
    plan.verify()?;
    Ok(plan)
}

impl CanonicalPlan {
    /// Check the plan is internally consistent.
    pub fn verify(&self) -> Result<(), EngineError> {
        let schedule = &self.metadata.departure_schedule;

        for (flight_id, route) in &self.flights {
            if &route.flight_id != flight_id {
                return Err(EngineError::Invariant(format!(
                    "route keyed {flight_id} carries flight id {}",
                    route.flight_id
                )));
            }
            if schedule.get(flight_id).is_none() {
                return Err(EngineError::Invariant(format!("flight {flight_id} has no scheduled departure")));
            }
            if let Some(index) = route
                .waypoints
                .windows(2)
                .position(|pair| pair[1].elapsed_s < pair[0].elapsed_s)
            {
                return Err(EngineError::Invariant(format!(
                    "flight {flight_id} elapsed time decreases after point {index}"
                )));
            }
        }

        if let Some(orphan) = schedule.entries.keys().find(|id| !self.flights.contains_key(*id)) {
            return Err(EngineError::Invariant(format!("scheduled flight {orphan} has no route")));
        }

        if self.metadata.total_flights != self.flights.len() {
            return Err(EngineError::Invariant(format!(
                "total_flights is {} but {} routes are present",
                self.metadata.total_flights,
                self.flights.len()
            )));
        }

        let participations: usize = schedule.entries.values().map(|entry| entry.conflict_count).sum();
        if participations != 2 * self.metadata.total_first_conflicts {
            return Err(EngineError::Invariant(format!(
                "{} first conflicts but {participations} flight participations",
                self.metadata.total_first_conflicts
            )));
        }

        if self.metadata.event_end <= self.metadata.event_start {
            return Err(EngineError::Invariant("event window is empty".to_string()));
        }

        Ok(())
    }

    /// Verify and atomically write the plan as pretty JSON.
    ///
    /// On any failure the file at `path` is left untouched.
    pub fn publish(&self, path: &Path) -> Result<(), EngineError> {
        self.verify()?;
        let json = serde_json::to_string_pretty(self)?;

        let temp_path = temp_sibling(path);
        if let Err(err) = fs::write(&temp_path, json).and_then(|_| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }

        tracing::info!(
            path = %path.display(),
            flights = self.metadata.total_flights,
            first_conflicts = self.metadata.total_first_conflicts,
            "Published canonical plan"
        );
        Ok(())
    }

    /// Read and verify a previously published plan.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path)?;
        let plan: CanonicalPlan = serde_json::from_str(&text)?;
        plan.verify()?;
        Ok(plan)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
