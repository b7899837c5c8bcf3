//! Debounce and poll windows.

use std::time::Duration;

use campus_filters::ViewSpec;

/// Quiet period before a changed request is issued.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Re-issue interval for polling views.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Timer settings for one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Debounce window.
    pub debounce: Duration,
    /// Poll interval, for near-real-time views only.
    pub poll_interval: Option<Duration>,
}

impl SchedulePolicy {
    /// Debounce only.
    #[must_use]
    pub const fn debounced(debounce: Duration) -> Self {
        Self {
            debounce,
            poll_interval: None,
        }
    }

    /// Debounce plus a fixed poll interval.
    #[must_use]
    pub const fn polling(debounce: Duration, poll_interval: Duration) -> Self {
        Self {
            debounce,
            poll_interval: Some(poll_interval),
        }
    }

    /// Policy for `view`: the poll interval applies only when the view polls.
    #[must_use]
    pub const fn for_view(view: &ViewSpec, debounce: Duration, poll_interval: Duration) -> Self {
        if view.polls() {
            Self::polling(debounce, poll_interval)
        } else {
            Self::debounced(debounce)
        }
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self::debounced(DEFAULT_DEBOUNCE)
    }
}
