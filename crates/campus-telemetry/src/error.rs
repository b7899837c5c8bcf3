//! Failures of log installation and list counter handling.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::string::FromUtf8Error;

use prometheus::Error as PrometheusError;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Stage at which a list counter could not be set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStep {
    /// Building the labelled counter vector.
    Build,
    /// Adding it to the engine registry.
    Register,
}

impl Display for CounterStep {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Build => "build",
            Self::Register => "register",
        })
    }
}

/// Telemetry failures surfaced to the CLI.
#[derive(Debug)]
pub enum TelemetryError {
    /// Another global subscriber already owns the process logs.
    LogInstall {
        /// Subscriber installation error.
        source: TryInitError,
    },
    /// A per-view list counter could not be set up.
    Counter {
        /// Counter name, such as `list_fetches_total`.
        counter: &'static str,
        /// Setup stage that failed.
        step: CounterStep,
        /// Registry error.
        source: PrometheusError,
    },
    /// The text exposition of the list counters failed.
    Exposition {
        /// Encoder error.
        source: PrometheusError,
    },
    /// The encoder produced bytes that are not UTF-8.
    ExpositionText {
        /// Conversion error.
        source: FromUtf8Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogInstall { .. } => {
                formatter.write_str("campus logging is already installed in this process")
            }
            Self::Counter { counter, step, .. } => {
                write!(formatter, "could not {step} list counter `{counter}`")
            }
            Self::Exposition { .. } => formatter.write_str("could not render list counters"),
            Self::ExpositionText { .. } => {
                formatter.write_str("rendered list counters are not utf-8 text")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LogInstall { source } => Some(source),
            Self::Counter { source, .. } | Self::Exposition { source } => Some(source),
            Self::ExpositionText { source } => Some(source),
        }
    }
}
