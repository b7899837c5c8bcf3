//! Field checks applied after every layer has been merged.

use campus_telemetry::LogFormat;

use crate::error::{ConfigError, ConfigResult};
use crate::model::EngineConfig;

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn validate(config: &EngineConfig) -> ConfigResult<()> {
    if config.debounce_ms == 0 {
        return Err(ConfigError::invalid(
            "engine",
            "debounce_ms",
            Some("0".into()),
            "must be greater than zero",
        ));
    }
    if config.poll_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "engine",
            "poll_interval_secs",
            Some("0".into()),
            "must be greater than zero",
        ));
    }
    if let Some((view, _)) = config.page_sizes.iter().find(|(_, size)| **size == 0) {
        return Err(ConfigError::invalid(
            "page_sizes",
            view,
            Some("0".into()),
            "must be greater than zero",
        ));
    }
    if config.log_level.trim().is_empty() {
        return Err(ConfigError::invalid(
            "logging",
            "log_level",
            None,
            "must not be empty",
        ));
    }
    if let Some(format) = &config.log_format
        && LogFormat::parse(format).is_none()
    {
        return Err(ConfigError::invalid(
            "logging",
            "log_format",
            Some(format.clone()),
            "must be `pretty` or `json`",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn rejected_field(config: &EngineConfig) -> Option<String> {
        match validate(config) {
            Err(ConfigError::InvalidField { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn zero_windows_are_rejected() {
        let config = EngineConfig {
            debounce_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(rejected_field(&config).as_deref(), Some("debounce_ms"));

        let config = EngineConfig {
            poll_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert_eq!(rejected_field(&config).as_deref(), Some("poll_interval_secs"));
    }

    #[test]
    fn zero_page_sizes_name_the_view() {
        let config = EngineConfig {
            page_sizes: BTreeMap::from([("logs".to_string(), 0)]),
            ..EngineConfig::default()
        };
        assert_eq!(rejected_field(&config).as_deref(), Some("logs"));
    }

    #[test]
    fn unknown_log_formats_are_rejected() {
        let config = EngineConfig {
            log_format: Some("xml".into()),
            ..EngineConfig::default()
        };
        assert_eq!(rejected_field(&config).as_deref(), Some("log_format"));

        let config = EngineConfig {
            log_format: Some("JSON".into()),
            ..EngineConfig::default()
        };
        assert!(validate(&config).is_ok());
    }
}
