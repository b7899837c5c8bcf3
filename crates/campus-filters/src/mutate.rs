//! User-interaction handlers.
//!
//! Each handler returns the next local state and one shallow replace
//! navigation. The handler's cache key is deleted before the navigation is
//! handed back, so a cleared filter cannot be restored by the next
//! reconciliation. Every handler except pagination resets the page to 0 and
//! writes `page=0` into the URL.

use tracing::debug;

use crate::cache::{CacheAction, ParamCache};
use crate::decode;
use crate::descriptor::{FilterDescriptor, FilterKind, ViewSpec};
use crate::directory::DirectoryEntry;
use crate::filter_set::{FilterValue, ListState, SortKey, SortState};
use crate::query::Query;
use crate::reconcile::Navigation;
use crate::{PAGE_PARAM, SORT_PARAM};

/// Raw user input for one filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterInput {
    /// Single raw value (text box, select, checkbox, date picker, id).
    Value(String),
    /// Multi-select values.
    Values(Vec<String>),
    /// Date range end points as `YYYY-MM-DD`.
    Range {
        /// Start date.
        from: String,
        /// End date.
        to: String,
    },
    /// Directory entry picked from a lookup; keeps its label locally.
    Entry(DirectoryEntry),
    /// Remove the filter.
    Clear,
}

impl From<&str> for FilterInput {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

/// Next local state plus the navigation that publishes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    /// Local state after the interaction.
    pub state: ListState,
    /// Shallow replace carrying the next query string.
    pub navigation: Navigation,
}

/// Interaction handlers bound to one view.
#[derive(Clone, Debug)]
pub struct Mutator<'a> {
    view: &'a ViewSpec,
}

impl<'a> Mutator<'a> {
    /// Handlers for `view`.
    #[must_use]
    pub const fn new(view: &'a ViewSpec) -> Self {
        Self { view }
    }

    /// Set or clear filter `key`. Input that does not decode clears the filter.
    ///
    /// Returns `None` when the view declares no filter named `key`.
    pub fn set_filter(
        &self,
        url: &Query,
        state: &ListState,
        cache: &mut ParamCache,
        key: &str,
        input: FilterInput,
    ) -> Option<Mutation> {
        let Some(descriptor) = self.view.filter(key) else {
            debug!(view = self.view.list_key(), key, "ignoring undeclared filter");
            return None;
        };

        let value = interpret(descriptor, input);
        let mut next_state = state.clone();
        let mut next_url = url.clone();
        descriptor.remove_from(&mut next_url);
        match &value {
            Some(value) => {
                descriptor.encode(value, &mut next_url);
                next_state.filters.insert(key, value.clone());
            }
            None => {
                next_state.filters.remove(key);
            }
        }

        cache.delete(self.view.list_key(), key);
        if descriptor.affects_page() {
            self.reset_page(&mut next_state, &mut next_url, cache);
        }
        debug!(view = self.view.list_key(), key, cleared = value.is_none(), "filter changed");
        Some(Mutation {
            state: next_state,
            navigation: Navigation::replace(next_url),
        })
    }

    /// Replace the sort columns; undeclared columns are dropped.
    pub fn set_sort(
        &self,
        url: &Query,
        state: &ListState,
        cache: &mut ParamCache,
        sort: &[SortKey],
    ) -> Mutation {
        let requested: Vec<String> = sort.iter().map(ToString::to_string).collect();
        let requested: Vec<&str> = requested.iter().map(String::as_str).collect();
        let keys = decode::sort(&requested, self.view.sortable()).unwrap_or_default();

        let mut next_state = state.clone();
        let mut next_url = url.clone();
        next_url.remove(SORT_PARAM);
        for key in &keys {
            next_url.append(SORT_PARAM, key.to_string());
        }
        next_state.sort = SortState(keys);

        cache.delete(self.view.list_key(), SORT_PARAM);
        self.reset_page(&mut next_state, &mut next_url, cache);
        Mutation {
            state: next_state,
            navigation: Navigation::replace(next_url),
        }
    }

    /// Move to `page_index`, leaving filters and sort untouched.
    pub fn set_page(
        &self,
        url: &Query,
        state: &ListState,
        cache: &mut ParamCache,
        page_index: u32,
    ) -> Mutation {
        let mut next_state = state.clone();
        let mut next_url = url.clone();
        next_state.pagination.page_index = page_index;
        next_url.set(PAGE_PARAM, page_index.to_string());
        cache.delete(self.view.list_key(), PAGE_PARAM);
        Mutation {
            state: next_state,
            navigation: Navigation::replace(next_url),
        }
    }

    /// Clear every declared filter and the sort in one navigation.
    pub fn clear_all(&self, url: &Query, cache: &mut ParamCache) -> Mutation {
        let list_key = self.view.list_key();
        let mut next_state = ListState::initial(self.view);
        let mut next_url = url.clone();
        for descriptor in self.view.filters() {
            descriptor.remove_from(&mut next_url);
            cache.delete(list_key, descriptor.key());
        }
        next_url.remove(SORT_PARAM);
        cache.delete(list_key, SORT_PARAM);
        self.reset_page(&mut next_state, &mut next_url, cache);
        debug!(view = list_key, "all filters cleared");
        Mutation {
            state: next_state,
            navigation: Navigation::replace(next_url),
        }
    }

    fn reset_page(&self, state: &mut ListState, url: &mut Query, cache: &mut ParamCache) {
        state.pagination.page_index = 0;
        url.set(PAGE_PARAM, "0");
        cache.dispatch(self.view.list_key(), &CacheAction::SetPage { page_index: 0 });
    }
}

fn interpret(descriptor: &FilterDescriptor, input: FilterInput) -> Option<FilterValue> {
    let key = descriptor.key();
    let raw: Query = match (&input, descriptor.kind()) {
        (FilterInput::Clear, _) => return None,
        (FilterInput::Range { from, to }, FilterKind::DateRange { end_param, .. }) => {
            [(key, from.as_str()), (end_param.as_str(), to.as_str())]
                .into_iter()
                .collect()
        }
        (FilterInput::Range { .. }, _) => return None,
        (FilterInput::Value(value), _) => std::iter::once((key, value.as_str())).collect(),
        (FilterInput::Values(values), _) => {
            values.iter().map(|value| (key, value.as_str())).collect()
        }
        (FilterInput::Entry(entry), _) => std::iter::once((key, entry.key.as_str())).collect(),
    };
    let decoded = descriptor.decode(&raw)?;
    match (decoded, input) {
        (FilterValue::Reference(_), FilterInput::Entry(entry)) => {
            Some(FilterValue::Reference(entry))
        }
        (decoded, _) => Some(decoded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedParams;

    fn view() -> ViewSpec {
        ViewSpec::builder("users")
            .filter(FilterDescriptor::text("search"))
            .filter(FilterDescriptor::choice("role", &["admin", "teacher", "student"]))
            .filter(FilterDescriptor::reference("school_id", "schools"))
            .filter(FilterDescriptor::many("classroom_ids"))
            .filter(FilterDescriptor::flag("compact").keep_page())
            .sortable(&["name", "created_at"])
            .build()
            .expect("valid view")
    }

    fn seeded_cache() -> ParamCache {
        let mut cache = ParamCache::new();
        let mut params = CachedParams::new();
        params.insert("search".into(), Query::parse("search=old"));
        params.insert("role".into(), Query::parse("role=admin"));
        params.insert(SORT_PARAM.into(), Query::parse("sort=name"));
        cache.set("users", params);
        cache
    }

    fn state_at_page(view: &ViewSpec, page_index: u32) -> ListState {
        let mut state = ListState::initial(view);
        state.pagination.page_index = page_index;
        state
    }

    #[test]
    fn setting_a_filter_resets_page_and_drops_cache_key() {
        let view = view();
        let mut cache = seeded_cache();
        let url = Query::parse("role=admin&page=3");
        let mutation = Mutator::new(&view)
            .set_filter(&url, &state_at_page(&view, 3), &mut cache, "search", "smith".into())
            .expect("declared filter");

        assert_eq!(mutation.navigation.query.to_string(), "role=admin&page=0&search=smith");
        assert!(mutation.navigation.replace && mutation.navigation.shallow);
        assert_eq!(mutation.state.pagination.page_index, 0);
        assert_eq!(
            mutation.state.filters.get("search"),
            Some(&FilterValue::Text("smith".into()))
        );
        assert!(cache.raw("users", "search").is_none());
        assert!(cache.raw("users", "role").is_some());
    }

    #[test]
    fn empty_input_clears_the_filter() {
        let view = view();
        let mut cache = seeded_cache();
        let mut state = ListState::initial(&view);
        state
            .filters
            .insert("search", FilterValue::Text("old".into()));
        let mutation = Mutator::new(&view)
            .set_filter(
                &Query::parse("search=old"),
                &state,
                &mut cache,
                "search",
                "".into(),
            )
            .expect("declared filter");
        assert_eq!(mutation.navigation.query.to_string(), "page=0");
        assert!(!mutation.state.filters.contains("search"));
        assert!(cache.raw("users", "search").is_none());
    }

    #[test]
    fn multi_value_filters_delete_then_reappend() {
        let view = view();
        let mutation = Mutator::new(&view)
            .set_filter(
                &Query::parse("classroom_ids=1&search=x&classroom_ids=2"),
                &ListState::initial(&view),
                &mut ParamCache::new(),
                "classroom_ids",
                FilterInput::Values(vec!["4".into(), String::new(), "5".into()]),
            )
            .expect("declared filter");
        assert_eq!(
            mutation.navigation.query.to_string(),
            "search=x&classroom_ids=4&classroom_ids=5&page=0"
        );
    }

    #[test]
    fn picked_entries_keep_their_label() {
        let view = view();
        let entry = DirectoryEntry::new("3", "North High");
        let mutation = Mutator::new(&view)
            .set_filter(
                &Query::new(),
                &ListState::initial(&view),
                &mut ParamCache::new(),
                "school_id",
                FilterInput::Entry(entry.clone()),
            )
            .expect("declared filter");
        assert_eq!(
            mutation.state.filters.get("school_id"),
            Some(&FilterValue::Reference(entry))
        );
    }

    #[test]
    fn keep_page_filters_leave_pagination_alone() {
        let view = view();
        let mutation = Mutator::new(&view)
            .set_filter(
                &Query::parse("page=2"),
                &state_at_page(&view, 2),
                &mut ParamCache::new(),
                "compact",
                "true".into(),
            )
            .expect("declared filter");
        assert_eq!(mutation.state.pagination.page_index, 2);
        assert_eq!(mutation.navigation.query.to_string(), "page=2&compact=true");
    }

    #[test]
    fn undeclared_filters_are_ignored() {
        let view = view();
        assert!(
            Mutator::new(&view)
                .set_filter(
                    &Query::new(),
                    &ListState::initial(&view),
                    &mut ParamCache::new(),
                    "grade",
                    "1".into(),
                )
                .is_none()
        );
    }

    #[test]
    fn paging_keeps_filters() {
        let view = view();
        let mut state = ListState::initial(&view);
        state.filters.insert("role", FilterValue::Choice("teacher".into()));
        let mut cache = seeded_cache();
        cache.dispatch("users", &CacheAction::SetPage { page_index: 7 });
        let mutation = Mutator::new(&view).set_page(
            &Query::parse("role=teacher&page=0"),
            &state,
            &mut cache,
            4,
        );
        assert_eq!(mutation.state.filters, state.filters);
        assert_eq!(mutation.state.pagination.page_index, 4);
        assert_eq!(mutation.navigation.query.to_string(), "role=teacher&page=4");
        assert!(cache.raw("users", PAGE_PARAM).is_none());
        assert!(cache.raw("users", "role").is_some());
    }

    #[test]
    fn sort_changes_filter_columns_and_reset_page() {
        let view = view();
        let mut cache = seeded_cache();
        let mutation = Mutator::new(&view).set_sort(
            &Query::parse("sort=name&page=5"),
            &state_at_page(&view, 5),
            &mut cache,
            &[SortKey::desc("created_at"), SortKey::asc("password")],
        );
        assert_eq!(mutation.navigation.query.to_string(), "page=0&sort=-created_at");
        assert_eq!(mutation.state.sort, SortState(vec![SortKey::desc("created_at")]));
        assert!(cache.raw("users", SORT_PARAM).is_none());
    }

    #[test]
    fn clear_all_is_one_navigation() {
        let view = view();
        let mut cache = seeded_cache();
        let mutation = Mutator::new(&view).clear_all(
            &Query::parse("search=old&role=admin&classroom_ids=1&sort=name&page=2&tab=archive"),
            &mut cache,
        );
        assert_eq!(mutation.navigation.query.to_string(), "page=0&tab=archive");
        assert_eq!(mutation.state, ListState::initial(&view));
        let remaining = cache.get("users").expect("page entry");
        assert_eq!(remaining.keys().collect::<Vec<_>>(), vec![PAGE_PARAM]);
    }
}
