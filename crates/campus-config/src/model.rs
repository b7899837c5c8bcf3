//! Typed engine configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use campus_fetch::SchedulePolicy;
use campus_filters::{Catalog, FilterError, ViewSpec};
use campus_telemetry::{LogFormat, LoggingConfig};
use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_DEBOUNCE_MS, DEFAULT_LOG_LEVEL, DEFAULT_POLL_INTERVAL_SECS};
use crate::error::{ConfigError, ConfigResult};

/// Tunables for the filter engine and its logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Quiet period before a changed list request is sent.
    pub debounce_ms: u64,
    /// Re-fetch interval for views that poll.
    pub poll_interval_secs: u64,
    /// Page size overrides keyed by list key.
    pub page_sizes: BTreeMap<String, u32>,
    /// Fallback log directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// `pretty` or `json`; inferred from the build profile when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            page_sizes: BTreeMap::new(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: None,
        }
    }
}

impl EngineConfig {
    /// Debounce window.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Scheduler timers for `view`; only polling views get the poll interval.
    #[must_use]
    pub const fn schedule_policy(&self, view: &ViewSpec) -> SchedulePolicy {
        SchedulePolicy::for_view(view, self.debounce(), self.poll_interval())
    }

    /// Resolved log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_setting(self.log_format.as_deref())
    }

    /// Logging settings for [`campus_telemetry::init_logging`], tagged with
    /// the caller's build identifier.
    #[must_use]
    pub fn logging<'a>(&'a self, build_sha: &'a str) -> LoggingConfig<'a> {
        LoggingConfig {
            level: &self.log_level,
            format: self.log_format(),
            build_sha,
        }
    }

    /// Apply the page size overrides to `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when an override names a view the
    /// catalog does not declare or sets a zero size.
    pub fn apply_page_sizes(&self, catalog: Catalog) -> ConfigResult<Catalog> {
        catalog
            .with_page_sizes(&self.page_sizes)
            .map_err(|error| match error {
                FilterError::UnknownView { view } => {
                    ConfigError::invalid("page_sizes", &view, None, "unknown list view")
                }
                FilterError::InvalidPageSize { view, page_size } => ConfigError::invalid(
                    "page_sizes",
                    &view,
                    Some(page_size.to_string()),
                    "must be greater than zero",
                ),
                _ => ConfigError::invalid("page_sizes", "*", None, "rejected by the catalog"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_engine_windows() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(400));
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.log_level, "info");
        assert!(config.page_sizes.is_empty());
    }

    #[test]
    fn explicit_log_format_wins_over_inference() {
        let config = EngineConfig {
            log_format: Some("json".into()),
            ..EngineConfig::default()
        };
        assert_eq!(config.log_format(), LogFormat::Json);
        let logging = config.logging("4f2c9e1");
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.build_sha, "4f2c9e1");
    }

    #[test]
    fn page_size_overrides_reach_the_catalog() {
        let catalog = Catalog::standard().expect("standard catalog");
        let config = EngineConfig {
            page_sizes: BTreeMap::from([("users".to_string(), 100)]),
            ..EngineConfig::default()
        };
        let catalog = config.apply_page_sizes(catalog).expect("known view");
        assert_eq!(catalog.get("users").map(|view| view.page_size()).ok(), Some(100));

        let config = EngineConfig {
            page_sizes: BTreeMap::from([("grades".to_string(), 10)]),
            ..EngineConfig::default()
        };
        let error = config
            .apply_page_sizes(Catalog::standard().expect("standard catalog"))
            .expect_err("unknown view");
        assert!(matches!(
            error,
            ConfigError::InvalidField { ref field, reason: "unknown list view", .. } if field == "grades"
        ));
    }
}
