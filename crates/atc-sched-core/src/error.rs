//! Error types for route intake and engine runs.

use thiserror::Error;

/// Per-flight rejection raised before interpolation.
///
/// A `RouteError` never aborts a run: the offending flight is dropped and the
/// remaining flights continue through conflict detection and scheduling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("flight {flight_id}: route has no waypoints")]
    Empty { flight_id: String },

    #[error("flight {flight_id}: route needs an origin and a destination, got {count} waypoint(s)")]
    TooFewWaypoints { flight_id: String, count: usize },

    #[error("flight {flight_id}: first waypoint must be at elapsed 0s, got {elapsed_s}s")]
    StartNotAtZero { flight_id: String, elapsed_s: f64 },

    #[error(
        "flight {flight_id}: elapsed time goes backwards at waypoint {index} ({previous_s}s -> {elapsed_s}s)"
    )]
    NonMonotonicTime {
        flight_id: String,
        index: usize,
        previous_s: f64,
        elapsed_s: f64,
    },

    #[error("flight {flight_id}: waypoint {index} has a non-finite position or time")]
    NonFinite { flight_id: String, index: usize },

    #[error("flight {flight_id}: phase marker {marker} at index {index} is out of range or out of order")]
    PhaseMarker {
        flight_id: String,
        marker: &'static str,
        index: usize,
    },

    #[error("flight {flight_id}: duplicate flight identifier")]
    Duplicate { flight_id: String },
}

impl RouteError {
    pub fn flight_id(&self) -> &str {
        match self {
            RouteError::Empty { flight_id }
            | RouteError::TooFewWaypoints { flight_id, .. }
            | RouteError::StartNotAtZero { flight_id, .. }
            | RouteError::NonMonotonicTime { flight_id, .. }
            | RouteError::NonFinite { flight_id, .. }
            | RouteError::PhaseMarker { flight_id, .. }
            | RouteError::Duplicate { flight_id } => flight_id,
        }
    }
}

/// Fatal errors. Any of these stops publication of the canonical plan.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("canonical plan invariant violated: {0}")]
    Invariant(String),

    #[error("event window end {end} is not after start {start}")]
    InvalidWindow { start: String, end: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
