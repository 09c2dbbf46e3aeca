pub mod assembler;
pub mod conflict;
pub mod error;
pub mod interpolation;
pub mod models;
pub mod pipeline;
pub mod reducer;
pub mod rules;
pub mod schedule;
pub mod spatial;

pub use assembler::{assemble, CanonicalPlan, PlanMetadata};
pub use conflict::{
    resolve_exempt_zones, AircraftState, ConflictEvent, ConflictKind, ConflictScanner, DepartureOffsets,
    ExemptZone, NearestWaypoint,
};
pub use error::{EngineError, RouteError};
pub use interpolation::{interpolate_route, prepare_routes, PreparedRoutes};
pub use models::{EventWindow, FlightPhase, FlightPlan, Waypoint};
pub use pipeline::{run, RunOutput};
pub use reducer::{reduce_conflicts, ReducedConflicts};
pub use rules::{EngineConfig, ExemptAirport, InterpolationRules, ScheduleRules, SeparationRules};
pub use schedule::{
    nominal_offsets, requested_offsets, DepartureSchedule, DepartureScheduler, ScheduleEntry, ScheduleStatus,
    SeparationRule,
};
pub use spatial::{haversine_distance, haversine_nm};
