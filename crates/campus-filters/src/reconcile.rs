//! Route-ready reconciliation of URL and cached filter state.
//!
//! # Design
//! - `Init -> WaitingForPrerequisites -> Reconciling -> Stable`; a pass only
//!   runs once every directory needed by the current values has loaded, so a
//!   view never reconciles against a partial set of directories.
//! - URL values win. Cached values fill gaps and are written back to the URL
//!   in one replace-style navigation that rewrites only the restored keys;
//!   parameters the view does not declare survive it. URL values are written
//!   through to the cache.
//! - The canonical rewrite is a fixed point: reconciling its result again adopts
//!   nothing from the cache and issues no further redirect.
//! - The current-month date-range default applies only on the first pass of a mount.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheAction, CachedParams, ParamCache};
use crate::decode;
use crate::descriptor::ViewSpec;
use crate::directory::{Directories, DirectoryId};
use crate::filter_set::{ListState, SortState};
use crate::query::Query;
use crate::{PAGE_PARAM, SORT_PARAM};

/// Reconciler lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The route has not reported ready yet.
    Init,
    /// Route ready, waiting for reference directories.
    WaitingForPrerequisites,
    /// A pass ran and issued a redirect; the next route event confirms it.
    Reconciling,
    /// The URL already matches the adopted state.
    Stable,
}

/// Router readiness as seen by the reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteState<'a> {
    /// Query parameters are not available yet.
    NotReady,
    /// Query parameters of the current location.
    Ready(&'a Query),
}

/// URL rewrite requested by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Navigation {
    /// Next query string.
    pub query: Query,
    /// Replace the current history entry instead of pushing one.
    pub replace: bool,
    /// Skip re-running route data loaders.
    pub shallow: bool,
    /// Reset scroll position.
    pub scroll: bool,
}

impl Navigation {
    /// Shallow replace that keeps the scroll position.
    #[must_use]
    pub const fn replace(query: Query) -> Self {
        Self {
            query,
            replace: true,
            shallow: true,
            scroll: false,
        }
    }

    /// Relative href (`?a=1&b=2`, or `?` for an empty query).
    #[must_use]
    pub fn href(&self) -> String {
        format!("?{}", self.query)
    }
}

/// Outcome of one completed pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Adopted list state.
    pub state: ListState,
    /// Single batched rewrite, when any value did not come from the URL.
    pub redirect: Option<Navigation>,
    /// Keys restored from the cache.
    pub adopted_from_cache: Vec<String>,
    /// Keys filled by the first-load default.
    pub defaulted: Vec<String>,
    /// Cached keys dropped because they no longer decode or resolve.
    pub purged: Vec<String>,
}

/// Result of feeding one route event to the reconciler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ReconcileStep {
    /// Nothing ran; the reconciler is still in `phase`.
    Deferred {
        /// Current phase (`Init` or `WaitingForPrerequisites`).
        phase: Phase,
        /// Directories still loading.
        missing: BTreeSet<DirectoryId>,
    },
    /// A pass completed.
    Reconciled(Reconciliation),
}

/// Per-mount reconciliation state machine.
#[derive(Clone, Debug)]
pub struct Reconciler {
    view: Arc<ViewSpec>,
    phase: Phase,
    first_load: bool,
    redirected: bool,
}

#[derive(Default)]
struct Pass {
    rewrite: bool,
    adopted: Vec<String>,
    defaulted: Vec<String>,
    purged: Vec<String>,
}

impl Pass {
    fn adopt(&mut self, key: &str) {
        self.rewrite = true;
        self.adopted.push(key.to_string());
    }

    fn purge(&mut self, cache: &mut ParamCache, list_key: &str, key: &str) {
        cache.delete(list_key, key);
        self.purged.push(key.to_string());
    }

    fn touched(&self, key: &str) -> bool {
        self.adopted.iter().chain(&self.defaulted).any(|seen| seen == key)
    }

    /// `url` with every adopted or defaulted key re-encoded from `state`.
    fn rewritten_url(&self, view: &ViewSpec, url: &Query, state: &ListState) -> Query {
        let mut next = url.clone();
        for descriptor in view.filters() {
            if !self.touched(descriptor.key()) {
                continue;
            }
            descriptor.remove_from(&mut next);
            if let Some(value) = state.filters.get(descriptor.key()) {
                descriptor.encode(value, &mut next);
            }
        }
        if self.touched(PAGE_PARAM) {
            next.set(PAGE_PARAM, state.pagination.page_index.to_string());
        }
        if self.touched(SORT_PARAM) {
            next.remove(SORT_PARAM);
            for key in &state.sort.0 {
                next.append(SORT_PARAM, key.to_string());
            }
        }
        next
    }
}

impl Reconciler {
    /// Fresh reconciler for a newly mounted page.
    #[must_use]
    pub const fn new(view: Arc<ViewSpec>) -> Self {
        Self {
            view,
            phase: Phase::Init,
            first_load: true,
            redirected: false,
        }
    }

    /// View being reconciled.
    #[must_use]
    pub fn view(&self) -> &ViewSpec {
        &self.view
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the one-shot first-load defaults are still pending.
    #[must_use]
    pub const fn is_first_load(&self) -> bool {
        self.first_load
    }

    /// Handle one route event.
    ///
    /// Cache writes for URL-supplied values and purges of stale cache entries
    /// are applied to `cache` before returning.
    pub fn run(
        &mut self,
        route: RouteState<'_>,
        cache: &mut ParamCache,
        directories: &Directories,
        today: NaiveDate,
    ) -> ReconcileStep {
        let RouteState::Ready(url) = route else {
            self.phase = Phase::Init;
            return ReconcileStep::Deferred {
                phase: Phase::Init,
                missing: BTreeSet::new(),
            };
        };

        let view = Arc::clone(&self.view);
        let list_key = view.list_key();
        let cached = cache.get(list_key).cloned().unwrap_or_default();
        let required = view.required_directories(url, Some(&cached));
        if !directories.all_loaded(&required) {
            let missing = directories.missing(&required);
            debug!(view = list_key, ?missing, "waiting for reference directories");
            self.phase = Phase::WaitingForPrerequisites;
            return ReconcileStep::Deferred {
                phase: self.phase,
                missing,
            };
        }

        self.phase = Phase::Reconciling;
        let mut state = ListState::initial(&view);
        let mut pass = Pass::default();

        for descriptor in view.filters() {
            let key = descriptor.key();
            if let Some(value) = descriptor.decode(url) {
                cache.dispatch(
                    list_key,
                    &CacheAction::SetFilter {
                        key: key.to_string(),
                        raw: descriptor.fragment(&value),
                    },
                );
                state
                    .filters
                    .insert(key, descriptor.resolve(value, directories));
                continue;
            }
            if let Some(raw) = cached.get(key) {
                match descriptor.decode(raw) {
                    Some(value) if descriptor.exists_in(&value, directories) => {
                        state
                            .filters
                            .insert(key, descriptor.resolve(value, directories));
                        pass.adopt(key);
                        continue;
                    }
                    _ => pass.purge(cache, list_key, key),
                }
            }
            if self.first_load
                && let Some(value) = descriptor.first_load_default(today)
            {
                cache.dispatch(
                    list_key,
                    &CacheAction::SetFilter {
                        key: key.to_string(),
                        raw: descriptor.fragment(&value),
                    },
                );
                state.filters.insert(key, value);
                pass.rewrite = true;
                pass.defaulted.push(key.to_string());
            }
        }

        self.reconcile_page(url, &cached, cache, &mut state, &mut pass);
        self.reconcile_sort(url, &cached, cache, &mut state, &mut pass);

        self.first_load = false;
        let redirect = pass
            .rewrite
            .then(|| Navigation::replace(pass.rewritten_url(&view, url, &state)));
        match &redirect {
            Some(navigation) => {
                if self.redirected {
                    warn!(
                        view = list_key,
                        redirect = %navigation.href(),
                        "reconciliation redirected on consecutive passes"
                    );
                }
                debug!(
                    view = list_key,
                    redirect = %navigation.href(),
                    adopted = ?pass.adopted,
                    defaulted = ?pass.defaulted,
                    "reconciled with redirect"
                );
                self.redirected = true;
            }
            None => {
                debug!(view = list_key, filters = state.filters.len(), "reconciled");
                self.redirected = false;
                self.phase = Phase::Stable;
            }
        }

        ReconcileStep::Reconciled(Reconciliation {
            state,
            redirect,
            adopted_from_cache: pass.adopted,
            defaulted: pass.defaulted,
            purged: pass.purged,
        })
    }

    fn reconcile_page(
        &self,
        url: &Query,
        cached: &CachedParams,
        cache: &mut ParamCache,
        state: &mut ListState,
        pass: &mut Pass,
    ) {
        let list_key = self.view.list_key();
        if let Some(page_index) = decode::page(url.get(PAGE_PARAM)) {
            cache.dispatch(list_key, &CacheAction::SetPage { page_index });
            state.pagination.page_index = page_index;
        } else if let Some(raw) = cached.get(PAGE_PARAM) {
            match decode::page(raw.get(PAGE_PARAM)) {
                Some(0) => {}
                Some(page_index) => {
                    state.pagination.page_index = page_index;
                    pass.adopt(PAGE_PARAM);
                }
                None => pass.purge(cache, list_key, PAGE_PARAM),
            }
        }
    }

    fn reconcile_sort(
        &self,
        url: &Query,
        cached: &CachedParams,
        cache: &mut ParamCache,
        state: &mut ListState,
        pass: &mut Pass,
    ) {
        let list_key = self.view.list_key();
        let sortable = self.view.sortable();
        if let Some(keys) = decode::sort(&url.get_all(SORT_PARAM), sortable) {
            state.sort = SortState(keys);
            cache.dispatch(
                list_key,
                &CacheAction::SetFilter {
                    key: SORT_PARAM.to_string(),
                    raw: state
                        .sort
                        .to_params()
                        .into_iter()
                        .map(|field| (SORT_PARAM, field))
                        .collect(),
                },
            );
        } else if let Some(raw) = cached.get(SORT_PARAM) {
            match decode::sort(&raw.get_all(SORT_PARAM), sortable) {
                Some(keys) => {
                    state.sort = SortState(keys);
                    pass.adopt(SORT_PARAM);
                }
                None => pass.purge(cache, list_key, SORT_PARAM),
            }
        }
    }
}
