//! Built-in configuration values and environment variable names.
//!
//! # Design
//! - Keep every default in one place so the model, loader and docs agree.

/// Debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
/// Poll interval in seconds for near-real-time views.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// Log level used when neither the file nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_LEVEL: &str = campus_telemetry::DEFAULT_LOG_LEVEL;

/// Path of a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "CAMPUS_CONFIG";
/// Overrides `debounce_ms`.
pub const DEBOUNCE_ENV: &str = "CAMPUS_DEBOUNCE_MS";
/// Overrides `poll_interval_secs`.
pub const POLL_INTERVAL_ENV: &str = "CAMPUS_POLL_INTERVAL_SECS";
/// Overrides `log_level`.
pub const LOG_LEVEL_ENV: &str = "CAMPUS_LOG_LEVEL";
/// Overrides `log_format`.
pub const LOG_FORMAT_ENV: &str = "CAMPUS_LOG_FORMAT";
