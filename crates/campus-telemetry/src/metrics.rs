//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Every counter is labelled by list view.

use std::sync::Arc;

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{CounterStep, Result, TelemetryError};

/// Prometheus-backed metrics registry for the filter engine.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    list_fetches_total: IntCounterVec,
    list_fetch_errors_total: IntCounterVec,
    list_stale_responses_total: IntCounterVec,
    list_redirects_total: IntCounterVec,
}

/// Per-view counter values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Fetches issued.
    pub fetches: u64,
    /// Fetches that failed.
    pub fetch_errors: u64,
    /// Responses dropped because a newer request was issued.
    pub stale_responses: u64,
    /// Reconciliation redirects issued.
    pub redirects: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the engine collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let list_fetches_total = register(
            &registry,
            "list_fetches_total",
            "List requests issued by the fetch scheduler",
        )?;
        let list_fetch_errors_total = register(
            &registry,
            "list_fetch_errors_total",
            "List requests that failed",
        )?;
        let list_stale_responses_total = register(
            &registry,
            "list_stale_responses_total",
            "List responses discarded because a newer request superseded them",
        )?;
        let list_redirects_total = register(
            &registry,
            "list_redirects_total",
            "Reconciliation redirects issued",
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                list_fetches_total,
                list_fetch_errors_total,
                list_stale_responses_total,
                list_redirects_total,
            }),
        })
    }

    /// Increment the issued-fetch counter for `view`.
    pub fn inc_fetch(&self, view: &str) {
        self.inner
            .list_fetches_total
            .with_label_values(&[view])
            .inc();
    }

    /// Increment the failed-fetch counter for `view`.
    pub fn inc_fetch_error(&self, view: &str) {
        self.inner
            .list_fetch_errors_total
            .with_label_values(&[view])
            .inc();
    }

    /// Increment the stale-response counter for `view`.
    pub fn inc_stale_response(&self, view: &str) {
        self.inner
            .list_stale_responses_total
            .with_label_values(&[view])
            .inc();
    }

    /// Increment the redirect counter for `view`.
    pub fn inc_redirect(&self, view: &str) {
        self.inner
            .list_redirects_total
            .with_label_values(&[view])
            .inc();
    }

    /// Current counter values for `view`.
    #[must_use]
    pub fn snapshot(&self, view: &str) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches: self.inner.list_fetches_total.with_label_values(&[view]).get(),
            fetch_errors: self
                .inner
                .list_fetch_errors_total
                .with_label_values(&[view])
                .get(),
            stale_responses: self
                .inner
                .list_stale_responses_total
                .with_label_values(&[view])
                .get(),
            redirects: self
                .inner
                .list_redirects_total
                .with_label_values(&[view])
                .get(),
        }
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Exposition { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::ExpositionText { source })
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Metrics").finish_non_exhaustive()
    }
}

fn register(registry: &Registry, counter: &'static str, help: &str) -> Result<IntCounterVec> {
    let vec = IntCounterVec::new(Opts::new(counter, help), &["view"]).map_err(|source| {
        TelemetryError::Counter {
            counter,
            step: CounterStep::Build,
            source,
        }
    })?;
    registry
        .register(Box::new(vec.clone()))
        .map_err(|source| TelemetryError::Counter {
            counter,
            step: CounterStep::Register,
            source,
        })?;
    Ok(vec)
}
