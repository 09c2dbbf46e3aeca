//! Engine configuration resolution.
//!
//! Defaults, then an optional JSON file, then environment overrides. Explicit
//! command-line flags are applied last by the binary.

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use atc_sched_core::EngineConfig;

/// Load configuration from `path` (if given) and apply environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

/// Apply `ATC_SCHED_*` overrides; unparsable values are ignored with a warning.
pub fn apply_env_overrides(config: &mut EngineConfig, lookup: impl Fn(&str) -> Option<String>) {
    let read = |key: &str| -> Option<f64> {
        let raw = lookup(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable override");
                None
            }
        }
    };

    if let Some(value) = read("ATC_SCHED_SPACING_NM") {
        config.interpolation.spacing_nm = value;
    }
    if let Some(value) = read("ATC_SCHED_LATERAL_NM") {
        config.separation.lateral_nm = value;
    }
    if let Some(value) = read("ATC_SCHED_VERTICAL_FT") {
        config.separation.vertical_ft = value;
    }
    if let Some(value) = read("ATC_SCHED_MIN_ALTITUDE_FT") {
        config.separation.min_altitude_ft = value.round() as i32;
    }
    if let Some(value) = read("ATC_SCHED_WINDOW_MIN") {
        config.schedule.window_min = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_replace_defaults() {
        let vars = HashMap::from([
            ("ATC_SCHED_SPACING_NM", "1.5"),
            ("ATC_SCHED_MIN_ALTITUDE_FT", "4000"),
            ("ATC_SCHED_LATERAL_NM", "not-a-number"),
        ]);
        let mut config = EngineConfig::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.interpolation.spacing_nm, 1.5);
        assert_eq!(config.separation.min_altitude_ft, 4000);
        assert_eq!(config.separation.lateral_nm, 3.0);
    }

    #[test]
    fn config_file_is_merged_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(
            &path,
            r#"{"schedule": {"window_min": 90}, "exempt_airports": [{"code": "KJFK", "radius_nm": 8}]}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.schedule.window_min, 90.0);
        assert_eq!(config.schedule.step_min, 5.0);
        assert_eq!(config.exempt_airports[0].code, "KJFK");
    }
}
