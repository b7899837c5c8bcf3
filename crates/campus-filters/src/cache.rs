//! Session-scoped "last used filters" cache.
//!
//! # Design
//! - Entries are namespaced per list key and hold the raw query fragment each
//!   filter last wrote, so restoring a value goes through the same decoders as
//!   the URL.
//! - All updates go through [`reduce`], a pure function over an immutable
//!   per-list map; the cache never mutates a shared reference in place.
//! - Lifetime is the owning session. Entries are only dropped per key, never
//!   wholesale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::PAGE_PARAM;
use crate::query::Query;

/// Raw fragments cached for one list view, keyed by filter key.
pub type CachedParams = BTreeMap<String, Query>;

/// Reducer actions over one list view's cached params.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheAction {
    /// Store the raw parameters a filter currently carries.
    SetFilter {
        /// Filter key.
        key: String,
        /// Raw parameters owned by the filter.
        raw: Query,
    },
    /// Forget a filter.
    ClearFilter {
        /// Filter key.
        key: String,
    },
    /// Remember the current page.
    SetPage {
        /// Zero-based page index.
        page_index: u32,
    },
}

/// Apply `action` to `params`, returning the next map.
///
/// Setting a filter to an empty fragment is treated as clearing it.
#[must_use]
pub fn reduce(params: &CachedParams, action: &CacheAction) -> CachedParams {
    let mut next = params.clone();
    match action {
        CacheAction::SetFilter { key, raw } if raw.is_empty() => {
            next.remove(key);
        }
        CacheAction::SetFilter { key, raw } => {
            next.insert(key.clone(), raw.clone());
        }
        CacheAction::ClearFilter { key } => {
            next.remove(key);
        }
        CacheAction::SetPage { page_index } => {
            next.insert(
                PAGE_PARAM.to_string(),
                std::iter::once((PAGE_PARAM, page_index.to_string())).collect(),
            );
        }
    }
    next
}

/// Per-list-key cache of the last filter selections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamCache {
    lists: BTreeMap<String, CachedParams>,
}

impl ParamCache {
    /// Empty cache for a new session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lists: BTreeMap::new(),
        }
    }

    /// Cached params for `list_key`.
    #[must_use]
    pub fn get(&self, list_key: &str) -> Option<&CachedParams> {
        self.lists.get(list_key)
    }

    /// Raw fragment cached for one filter of `list_key`.
    #[must_use]
    pub fn raw(&self, list_key: &str, filter_key: &str) -> Option<&Query> {
        self.lists.get(list_key)?.get(filter_key)
    }

    /// Merge `partial` into the params cached for `list_key`.
    pub fn set(&mut self, list_key: &str, partial: CachedParams) {
        for (key, raw) in partial {
            self.dispatch(list_key, &CacheAction::SetFilter { key, raw });
        }
    }

    /// Drop one filter from the params cached for `list_key`.
    pub fn delete(&mut self, list_key: &str, filter_key: &str) {
        self.dispatch(
            list_key,
            &CacheAction::ClearFilter {
                key: filter_key.to_string(),
            },
        );
    }

    /// Run `action` through [`reduce`] for `list_key`.
    pub fn dispatch(&mut self, list_key: &str, action: &CacheAction) {
        let current = self.lists.get(list_key).cloned().unwrap_or_default();
        let next = reduce(&current, action);
        trace!(view = list_key, ?action, "param cache updated");
        if next.is_empty() {
            self.lists.remove(list_key);
        } else {
            self.lists.insert(list_key.to_string(), next);
        }
    }

    /// Cached params of every list view, in list-key order.
    pub fn lists(&self) -> impl Iterator<Item = (&str, &CachedParams)> {
        self.lists
            .iter()
            .map(|(list_key, params)| (list_key.as_str(), params))
    }

    /// Number of list views with cached params.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether no list view has cached params.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(key: &str, raw: &str) -> CacheAction {
        CacheAction::SetFilter {
            key: key.to_string(),
            raw: Query::parse(raw),
        }
    }

    #[test]
    fn reduce_leaves_its_input_untouched() {
        let before = reduce(&CachedParams::new(), &set("status", "status=active"));
        let after = reduce(
            &before,
            &CacheAction::ClearFilter {
                key: "status".into(),
            },
        );
        assert_eq!(before.len(), 1);
        assert!(after.is_empty());
    }

    #[test]
    fn empty_fragment_clears_the_filter() {
        let params = reduce(&CachedParams::new(), &set("search", "search=smith"));
        assert!(reduce(&params, &set("search", "")).is_empty());
    }

    #[test]
    fn set_page_stores_a_page_fragment() {
        let params = reduce(&CachedParams::new(), &CacheAction::SetPage { page_index: 2 });
        assert_eq!(
            params.get(PAGE_PARAM).map(ToString::to_string),
            Some("page=2".to_string())
        );
    }

    #[test]
    fn lists_are_isolated_and_cleared_per_key() {
        let mut cache = ParamCache::new();
        let mut partial = CachedParams::new();
        partial.insert("status".into(), Query::parse("status=active"));
        partial.insert("search".into(), Query::parse("search=smith"));
        cache.set("users", partial);
        cache.dispatch("payments", &set("status", "status=paid"));

        cache.delete("users", "status");
        assert!(cache.raw("users", "status").is_none());
        assert_eq!(
            cache.raw("users", "search").and_then(|raw| raw.get("search")),
            Some("smith")
        );
        assert_eq!(
            cache.raw("payments", "status").and_then(|raw| raw.get("status")),
            Some("paid")
        );

        cache.delete("users", "search");
        assert!(cache.get("users").is_none());
        assert_eq!(cache.len(), 1);
        let keys: Vec<&str> = cache.lists().map(|(list_key, _)| list_key).collect();
        assert_eq!(keys, vec!["payments"]);
    }

    #[test]
    fn actions_serialise_with_reducer_names() {
        let json = serde_json::to_value(CacheAction::ClearFilter { key: "q".into() })
            .expect("serialise action");
        assert_eq!(json["type"], "CLEAR_FILTER");
        assert_eq!(json["key"], "q");
    }
}
