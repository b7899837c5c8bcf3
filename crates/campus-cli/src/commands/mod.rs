//! Command handlers grouped by concern.

pub(crate) mod mutate;
pub(crate) mod reconcile;
pub(crate) mod views;
pub(crate) mod watch;
