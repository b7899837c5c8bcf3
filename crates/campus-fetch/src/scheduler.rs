//! Debounced, optionally polled list fetching.
//!
//! # Design
//! - One worker task per mounted view; commands arrive over a channel and
//!   timers are plain `tokio::time` primitives owned by the worker, so
//!   unmounting (or dropping the handle) tears every timer down.
//! - A new request re-arms the debounce; only the settled request is sent.
//!   Returning to the last issued request skips the fetch unless it failed.
//! - Each issued fetch carries a generation and only the latest generation may
//!   publish. In-flight calls are never cancelled, their late results are dropped.

use std::sync::Arc;

use campus_filters::{ListRequest, ViewSpec};
use campus_telemetry::Metrics;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::policy::SchedulePolicy;
use crate::source::{ListPage, ListSource};

/// Latest list result published to the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot<T> {
    /// Rows of the latest accepted response.
    pub data: Vec<T>,
    /// Total matching rows reported by the latest accepted response.
    pub total: u64,
    /// A request is in flight.
    pub loading: bool,
    /// Failure of the latest request, if it failed.
    pub error: Option<FetchError>,
    /// Generation of the latest accepted response (0 before the first).
    pub generation: u64,
}

impl<T> Default for ListSnapshot<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            loading: false,
            error: None,
            generation: 0,
        }
    }
}

#[derive(Debug)]
enum Command {
    Schedule(ListRequest),
    Unmount,
}

type Completion<T> = (u64, FetchResult<ListPage<T>>);

/// Handle to a view's fetch worker.
///
/// Dropping the handle aborts the worker and its timers.
#[derive(Debug)]
pub struct FetchScheduler<T> {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<ListSnapshot<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T> FetchScheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Spawn the worker for `view` on the current tokio runtime.
    #[must_use]
    pub fn spawn(
        view: Arc<ViewSpec>,
        policy: SchedulePolicy,
        source: Arc<dyn ListSource<T>>,
        metrics: Option<Metrics>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (completions, completion_rx) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(ListSnapshot::default());
        let worker = Worker {
            view,
            policy,
            source,
            metrics,
            publisher,
            completions,
            pending: None,
            settled: None,
            settled_failed: false,
            generation: 0,
        };
        let task = tokio::spawn(worker.run(command_rx, completion_rx));
        Self {
            commands,
            snapshots,
            task: Some(task),
        }
    }

    /// Hand the worker the request for the current state.
    ///
    /// Returns `false` once the worker has stopped.
    pub fn schedule(&self, request: ListRequest) -> bool {
        self.commands.send(Command::Schedule(request)).is_ok()
    }

    /// Receiver notified on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<T>> {
        self.snapshots.clone()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot<T> {
        self.snapshots.borrow().clone()
    }

    /// Stop the worker, discarding any pending debounce and poll timers.
    pub async fn unmount(mut self) {
        let _ = self.commands.send(Command::Unmount);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T> Drop for FetchScheduler<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Worker<T> {
    view: Arc<ViewSpec>,
    policy: SchedulePolicy,
    source: Arc<dyn ListSource<T>>,
    metrics: Option<Metrics>,
    publisher: watch::Sender<ListSnapshot<T>>,
    completions: mpsc::UnboundedSender<Completion<T>>,
    pending: Option<ListRequest>,
    settled: Option<ListRequest>,
    settled_failed: bool,
    generation: u64,
}

impl<T> Worker<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion<T>>,
    ) {
        let debounce = tokio::time::sleep(self.policy.debounce);
        tokio::pin!(debounce);
        let mut poll: Option<Interval> = None;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Schedule(request)) => {
                        if self.stage(request) {
                            debounce.as_mut().reset(Instant::now() + self.policy.debounce);
                        }
                    }
                    Some(Command::Unmount) | None => break,
                },
                () = &mut debounce, if self.pending.is_some() => {
                    self.fire();
                    poll = self.policy.poll_interval.map(|period| {
                        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        interval
                    });
                }
                () = next_tick(&mut poll) => self.repoll(),
                Some((generation, result)) = completions.recv() => self.complete(generation, result),
            }
        }
        debug!(view = self.view.list_key(), "fetch scheduler stopped");
    }

    /// Returns whether the debounce timer must be re-armed.
    fn stage(&mut self, request: ListRequest) -> bool {
        if self.pending.as_ref() == Some(&request) {
            return false;
        }
        if !self.settled_failed && self.settled.as_ref() == Some(&request) {
            if self.pending.take().is_some() {
                debug!(
                    view = self.view.list_key(),
                    "state returned to the issued request; pending fetch cancelled"
                );
            }
            return false;
        }
        self.pending = Some(request);
        true
    }

    fn fire(&mut self) {
        if let Some(request) = self.pending.take() {
            self.issue(request.clone());
            self.settled = Some(request);
        }
    }

    fn repoll(&mut self) {
        if let Some(request) = self.settled.clone() {
            debug!(view = self.view.list_key(), "poll interval elapsed");
            self.issue(request);
        }
    }

    fn issue(&mut self, request: ListRequest) {
        self.generation += 1;
        self.settled_failed = false;
        let generation = self.generation;
        let list_key = self.view.list_key();
        debug!(view = list_key, generation, offset = request.offset, "issuing list request");
        if let Some(metrics) = &self.metrics {
            metrics.inc_fetch(list_key);
        }
        self.publisher.send_modify(|snapshot| snapshot.loading = true);

        let source = Arc::clone(&self.source);
        let endpoint = self.view.endpoint().to_string();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = source.fetch(&endpoint, &request).await;
            let _ = completions.send((generation, result));
        });
    }

    fn complete(&mut self, generation: u64, result: FetchResult<ListPage<T>>) {
        let list_key = self.view.list_key();
        if generation != self.generation {
            debug!(
                view = list_key,
                generation,
                latest = self.generation,
                "discarding stale list response"
            );
            if let Some(metrics) = &self.metrics {
                metrics.inc_stale_response(list_key);
            }
            return;
        }

        match result {
            Ok(page) => {
                self.settled_failed = false;
                debug!(view = list_key, generation, total = page.total, "list response accepted");
                self.publisher.send_replace(ListSnapshot {
                    data: page.data,
                    total: page.total,
                    loading: false,
                    error: None,
                    generation,
                });
            }
            Err(error) => {
                self.settled_failed = true;
                warn!(
                    view = list_key,
                    generation,
                    error = %error,
                    detail = error.detail(),
                    "list request failed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.inc_fetch_error(list_key);
                }
                self.publisher.send_modify(|snapshot| {
                    snapshot.loading = false;
                    snapshot.error = Some(error);
                    snapshot.generation = generation;
                });
            }
        }
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
