//! Per-mount facade over the reconciler and interaction handlers.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::cache::ParamCache;
use crate::descriptor::ViewSpec;
use crate::directory::Directories;
use crate::filter_set::{ListState, SortKey};
use crate::mutate::{FilterInput, Mutation, Mutator};
use crate::query::Query;
use crate::reconcile::{Navigation, Phase, ReconcileStep, Reconciler, RouteState};
use crate::request::ListRequest;

/// State of one mounted list page.
///
/// Created on mount and dropped on unmount; the one-shot first-load defaults
/// live and die with it. The [`ParamCache`] is owned by the caller's session
/// and outlives every `ListSession`.
#[derive(Clone, Debug)]
pub struct ListSession {
    view: Arc<ViewSpec>,
    reconciler: Reconciler,
    url: Query,
    state: ListState,
}

impl ListSession {
    /// Mount a page for `view`.
    #[must_use]
    pub fn mount(view: Arc<ViewSpec>) -> Self {
        let state = ListState::initial(&view);
        Self {
            reconciler: Reconciler::new(Arc::clone(&view)),
            view,
            url: Query::new(),
            state,
        }
    }

    /// Mounted view.
    #[must_use]
    pub fn view(&self) -> &ViewSpec {
        &self.view
    }

    /// Reconciler phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.reconciler.phase()
    }

    /// Local list state.
    #[must_use]
    pub const fn state(&self) -> &ListState {
        &self.state
    }

    /// Last query string seen or written by this page.
    #[must_use]
    pub const fn url(&self) -> &Query {
        &self.url
    }

    /// Feed a route event, using today's local date for first-load defaults.
    pub fn on_route(
        &mut self,
        route: RouteState<'_>,
        cache: &mut ParamCache,
        directories: &Directories,
    ) -> ReconcileStep {
        self.on_route_at(route, cache, directories, Local::now().date_naive())
    }

    /// Feed a route event with an explicit current date.
    pub fn on_route_at(
        &mut self,
        route: RouteState<'_>,
        cache: &mut ParamCache,
        directories: &Directories,
        today: NaiveDate,
    ) -> ReconcileStep {
        if let RouteState::Ready(url) = route {
            self.url = url.clone();
        }
        let step = self.reconciler.run(route, cache, directories, today);
        if let ReconcileStep::Reconciled(reconciliation) = &step {
            self.state = reconciliation.state.clone();
        }
        step
    }

    /// Set or clear one filter; `None` when the view does not declare `key`.
    pub fn set_filter(
        &mut self,
        cache: &mut ParamCache,
        key: &str,
        input: impl Into<FilterInput>,
    ) -> Option<Navigation> {
        let mutation =
            Mutator::new(&self.view).set_filter(&self.url, &self.state, cache, key, input.into())?;
        Some(self.apply(mutation))
    }

    /// Change the sort columns.
    pub fn set_sort(&mut self, cache: &mut ParamCache, sort: &[SortKey]) -> Navigation {
        let mutation = Mutator::new(&self.view).set_sort(&self.url, &self.state, cache, sort);
        self.apply(mutation)
    }

    /// Move to another page.
    pub fn set_page(&mut self, cache: &mut ParamCache, page_index: u32) -> Navigation {
        let mutation = Mutator::new(&self.view).set_page(&self.url, &self.state, cache, page_index);
        self.apply(mutation)
    }

    /// Clear every filter and the sort.
    pub fn clear_all(&mut self, cache: &mut ParamCache) -> Navigation {
        let mutation = Mutator::new(&self.view).clear_all(&self.url, cache);
        self.apply(mutation)
    }

    /// Request for the current state, once the page has settled.
    ///
    /// `None` while the route is not ready, directories are loading, or a
    /// reconciliation redirect has not been confirmed yet.
    #[must_use]
    pub fn request(&self) -> Option<ListRequest> {
        (self.phase() == Phase::Stable).then(|| ListRequest::build(&self.view, &self.state))
    }

    fn apply(&mut self, mutation: Mutation) -> Navigation {
        self.state = mutation.state;
        self.url = mutation.navigation.query.clone();
        mutation.navigation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FilterDescriptor;
    use crate::request::WireValue;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
    }

    fn view() -> Arc<ViewSpec> {
        Arc::new(
            ViewSpec::builder("classrooms")
                .filter(FilterDescriptor::text("search"))
                .filter(FilterDescriptor::number("grade"))
                .build()
                .expect("valid view"),
        )
    }

    #[test]
    fn request_waits_for_a_stable_route() {
        let mut session = ListSession::mount(view());
        let mut cache = ParamCache::new();
        let directories = Directories::new();
        assert!(session.request().is_none());

        session.on_route_at(RouteState::NotReady, &mut cache, &directories, today());
        assert!(session.request().is_none());

        let url = Query::parse("grade=4");
        session.on_route_at(RouteState::Ready(&url), &mut cache, &directories, today());
        let request = session.request().expect("stable");
        assert_eq!(request.filter("grade"), Some(&WireValue::Number(4)));
    }

    #[test]
    fn mutations_update_local_state_and_url_immediately() {
        let mut session = ListSession::mount(view());
        let mut cache = ParamCache::new();
        let url = Query::parse("grade=4&page=2");
        session.on_route_at(RouteState::Ready(&url), &mut cache, &Directories::new(), today());

        let navigation = session
            .set_filter(&mut cache, "search", "north")
            .expect("declared filter");
        assert_eq!(navigation.href(), "?grade=4&page=0&search=north");
        assert_eq!(session.url(), &navigation.query);
        assert_eq!(session.state().pagination.page_index, 0);

        let navigation = session.set_page(&mut cache, 3);
        assert_eq!(navigation.href(), "?grade=4&page=3&search=north");
        assert_eq!(session.request().map(|request| request.offset), Some(60));

        let navigation = session.clear_all(&mut cache);
        assert_eq!(navigation.href(), "?page=0");
        assert!(session.state().filters.is_empty());
    }
}
