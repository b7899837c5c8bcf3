//! Layered configuration loading.
//!
//! # Design
//! - Layers apply in order: built-in defaults, an optional JSON file, then
//!   `CAMPUS_*` environment overrides.
//! - The environment is read through a lookup closure so callers and tests can
//!   supply their own.
//! - Validation runs once, on the merged result.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::{
    CONFIG_PATH_ENV, DEBOUNCE_ENV, LOG_FORMAT_ENV, LOG_LEVEL_ENV, POLL_INTERVAL_ENV,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::EngineConfig;
use crate::validate::validate;

/// Load configuration from `path` (or `CAMPUS_CONFIG`) and the process environment.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read or parsed, or when any
/// merged value fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<EngineConfig> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Load configuration reading variables through `env`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read or parsed, or when any
/// merged value fails validation.
pub fn load_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> ConfigResult<EngineConfig> {
    let file = path
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_PATH_ENV).map(PathBuf::from));

    let mut config = match file {
        Some(file) => read_file(&file)?,
        None => EngineConfig::default(),
    };
    apply_env(&mut config, &env)?;
    validate(&config)?;
    debug!(
        debounce_ms = config.debounce_ms,
        poll_interval_secs = config.poll_interval_secs,
        page_size_overrides = config.page_sizes.len(),
        "engine configuration loaded"
    );
    Ok(config)
}

fn read_file(path: &Path) -> ConfigResult<EngineConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env(config: &mut EngineConfig, env: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
    if let Some(value) = env(DEBOUNCE_ENV) {
        config.debounce_ms = parse_u64(DEBOUNCE_ENV, &value)?;
    }
    if let Some(value) = env(POLL_INTERVAL_ENV) {
        config.poll_interval_secs = parse_u64(POLL_INTERVAL_ENV, &value)?;
    }
    if let Some(value) = env(LOG_LEVEL_ENV) {
        config.log_level = value;
    }
    if let Some(value) = env(LOG_FORMAT_ENV) {
        config.log_format = Some(value);
    }
    Ok(())
}

fn parse_u64(variable: &str, value: &str) -> ConfigResult<u64> {
    value.trim().parse().map_err(|_| {
        ConfigError::invalid(
            "env",
            variable,
            Some(value.to_string()),
            "must be a non-negative integer",
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load_with(None, env_of(&[])).expect("defaults load");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = load_with(
            None,
            env_of(&[
                (DEBOUNCE_ENV, "250"),
                (POLL_INTERVAL_ENV, " 10 "),
                (LOG_LEVEL_ENV, "campus=debug"),
                (LOG_FORMAT_ENV, "json"),
            ]),
        )
        .expect("overrides load");
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.log_level, "campus=debug");
        assert_eq!(config.log_format.as_deref(), Some("json"));
    }

    #[test]
    fn malformed_numbers_name_the_variable() {
        let error = load_with(None, env_of(&[(DEBOUNCE_ENV, "soon")])).expect_err("rejected");
        match error {
            ConfigError::InvalidField {
                section,
                field,
                value,
                ..
            } => {
                assert_eq!(section, "env");
                assert_eq!(field, DEBOUNCE_ENV);
                assert_eq!(value.as_deref(), Some("soon"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_from_the_environment_fails_validation() {
        let error =
            load_with(None, env_of(&[(POLL_INTERVAL_ENV, "0")])).expect_err("zero rejected");
        assert!(matches!(
            error,
            ConfigError::InvalidField { ref field, .. } if field == "poll_interval_secs"
        ));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let path = Path::new("/definitely/missing/campus.json");
        let error = load_with(Some(path), env_of(&[])).expect_err("missing file");
        assert!(matches!(error, ConfigError::Io { path: ref reported, .. } if reported == path));
    }
}
