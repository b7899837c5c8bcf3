//! Typed filter values, list state, and the canonical query codec.
//!
//! # Design
//! - `FilterSet` only holds present values; absence is the missing key.
//! - State values are replaced wholesale, never edited in place by the engine.
//! - `encode_state` is the minimal serialisation; `decode_state` inverts it.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decode;
use crate::descriptor::ViewSpec;
use crate::directory::{Directories, DirectoryEntry};
use crate::query::Query;
use crate::{PAGE_PARAM, SORT_PARAM};

/// Inclusive calendar range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub from: NaiveDate,
    /// Last day included.
    pub to: NaiveDate,
}

impl DateRange {
    /// The calendar month containing `day`.
    #[must_use]
    pub fn month_of(day: NaiveDate) -> Self {
        let from = day.with_day(1).unwrap_or(day);
        let next_month = if from.month() == 12 {
            NaiveDate::from_ymd_opt(from.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(from.year(), from.month() + 1, 1)
        };
        let to = next_month.and_then(|next| next.pred_opt()).unwrap_or(day);
        Self { from, to }
    }
}

/// Decoded value of one filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    /// Free text.
    Text(String),
    /// Whitelisted choice.
    Choice(String),
    /// Non-negative integer.
    Number(u64),
    /// Boolean toggle.
    Flag(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Directory entry selected by id.
    Reference(DirectoryEntry),
    /// Non-empty set of values.
    Many(Vec<String>),
    /// Inclusive date range.
    DateRange(DateRange),
}

/// Active filters keyed by filter key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    values: BTreeMap<String, FilterValue>,
}

impl FilterSet {
    /// Empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.values.get(key)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Insert or replace the value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: FilterValue) {
        self.values.insert(key.into(), value);
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.values.remove(key)
    }

    /// Number of active filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no filter is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}

/// Page position; `page_size` is fixed per view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Zero-based page.
    pub page_index: u32,
    /// Rows per page.
    pub page_size: u32,
}

impl PaginationState {
    /// First page of `page_size` rows.
    #[must_use]
    pub const fn first(page_size: u32) -> Self {
        Self {
            page_index: 0,
            page_size,
        }
    }

    /// Row offset of the current page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page_index) * u64::from(self.page_size)
    }
}

/// One sort column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Column identifier.
    pub column_id: String,
    /// Descending when `true`.
    pub descending: bool,
}

impl SortKey {
    /// Ascending sort on `column`.
    #[must_use]
    pub fn asc(column: &str) -> Self {
        Self {
            column_id: column.to_string(),
            descending: false,
        }
    }

    /// Descending sort on `column`.
    #[must_use]
    pub fn desc(column: &str) -> Self {
        Self {
            column_id: column.to_string(),
            descending: true,
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(formatter, "-{}", self.column_id)
        } else {
            formatter.write_str(&self.column_id)
        }
    }
}

/// Ordered multi-column sort.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortState(pub Vec<SortKey>);

impl SortState {
    /// No sort applied.
    #[must_use]
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    /// Whether no column is sorted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefixed field names (`-field` for descending).
    #[must_use]
    pub fn to_params(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

/// Everything a list page derives from its URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    /// Active filters.
    pub filters: FilterSet,
    /// Page position.
    pub pagination: PaginationState,
    /// Sort columns.
    pub sort: SortState,
}

impl ListState {
    /// Unfiltered first page of `view`.
    #[must_use]
    pub fn initial(view: &ViewSpec) -> Self {
        Self {
            filters: FilterSet::new(),
            pagination: PaginationState::first(view.page_size()),
            sort: SortState::none(),
        }
    }
}

/// Canonical query string for `state`: filters in declaration order, then the
/// page (omitted on the first page), then sort entries.
#[must_use]
pub fn encode_state(view: &ViewSpec, state: &ListState) -> Query {
    let mut query = Query::new();
    for descriptor in view.filters() {
        if let Some(value) = state.filters.get(descriptor.key()) {
            descriptor.encode(value, &mut query);
        }
    }
    if state.pagination.page_index > 0 {
        query.append(PAGE_PARAM, state.pagination.page_index.to_string());
    }
    for key in &state.sort.0 {
        query.append(SORT_PARAM, key.to_string());
    }
    query
}

/// Decode `query` into list state, labelling reference ids from `directories`.
#[must_use]
pub fn decode_state(view: &ViewSpec, query: &Query, directories: &Directories) -> ListState {
    let mut filters = FilterSet::new();
    for descriptor in view.filters() {
        if let Some(value) = descriptor.decode(query) {
            filters.insert(descriptor.key(), descriptor.resolve(value, directories));
        }
    }
    ListState {
        filters,
        pagination: PaginationState {
            page_index: decode::page(query.get(PAGE_PARAM)).unwrap_or(0),
            page_size: view.page_size(),
        },
        sort: SortState(
            decode::sort(&query.get_all(SORT_PARAM), view.sortable()).unwrap_or_default(),
        ),
    }
}
