//! ATC scheduling CLI support for the `atc-sched` binary: configuration
//! loading, event window parsing, log output and the terminal summary.

pub mod config;
pub mod logging;
pub mod report;
pub mod time;

pub use config::{apply_env_overrides, load_config};
pub use logging::log_layer;
pub use report::render_summary;
pub use time::{parse_event_end, parse_event_time};
