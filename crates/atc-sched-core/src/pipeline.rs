//! End-to-end engine run.
//!
//! Stages hand typed values to each other in process: routes, conflict set,
//! schedule, canonical plan. Nothing is written to disk here; publishing the
//! canonical plan is left to the caller.

use serde::Serialize;

use crate::assembler::{assemble, CanonicalPlan};
use crate::conflict::ConflictScanner;
use crate::error::{EngineError, RouteError};
use crate::interpolation::prepare_routes;
use crate::models::{EventWindow, FlightPlan};
use crate::reducer::{reduce_conflicts, ReducedConflicts};
use crate::rules::EngineConfig;
use crate::schedule::{requested_offsets, DepartureScheduler};

/// Everything a run produces.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub canonical: CanonicalPlan,
    /// First conflicts at the requested departure offsets
    pub conflicts: ReducedConflicts,
    /// First conflicts that remain once scheduled departures are applied
    pub scheduled_conflicts: ReducedConflicts,
    #[serde(skip)]
    pub rejected: Vec<RouteError>,
}

/// Run validation, interpolation, scanning, reduction, scheduling and assembly.
///
/// Rejected routes are reported in [`RunOutput::rejected`] and do not stop the
/// run. Invalid configuration and canonical plan inconsistencies are fatal.
pub fn run(plans: &[FlightPlan], window: EventWindow, config: &EngineConfig) -> Result<RunOutput, EngineError> {
    config.validate()?;
    let duplicate_radius_nm = config.separation.duplicate_radius_nm;

    let prepared = prepare_routes(plans, &config.interpolation);
    let routes = prepared.routes;

    let scanner = ConflictScanner::from_config(config, &routes);
    let candidates = scanner.scan(&routes, &requested_offsets(&routes));
    let conflicts = reduce_conflicts(candidates, duplicate_radius_nm);

    let schedule = DepartureScheduler::new(config.schedule.clone()).schedule(&routes, &conflicts, &window);

    let scheduled_candidates = scanner.scan(&routes, &schedule.offsets(&window));
    let scheduled_conflicts = reduce_conflicts(scheduled_candidates, duplicate_radius_nm);

    let canonical = assemble(routes, schedule, &conflicts, &window)?;

    tracing::info!(
        flights = canonical.metadata.total_flights,
        rejected = prepared.rejected.len(),
        first_conflicts = conflicts.first_conflicts.len(),
        scheduled_conflicts = scheduled_conflicts.first_conflicts.len(),
        flagged = canonical.metadata.departure_schedule.flagged().count(),
        "Engine run complete"
    );

    Ok(RunOutput {
        canonical,
        conflicts,
        scheduled_conflicts,
        rejected: prepared.rejected,
    })
}
