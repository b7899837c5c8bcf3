//! Static filter declarations for a list view.
//!
//! # Design
//! - A descriptor owns its URL parameter names, its request wire names and its decoder.
//! - Views validate their descriptors once, so contention over a parameter
//!   (the source of redirect loops) is rejected at declaration time.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;

use crate::cache::CachedParams;
use crate::decode::{self, DATE_FORMAT};
use crate::directory::{Directories, DirectoryEntry, DirectoryId};
use crate::error::{FilterError, FilterResult};
use crate::filter_set::{DateRange, FilterValue};
use crate::query::Query;
use crate::request::{RESERVED_WIRE_NAMES, WireValue};
use crate::{PAGE_PARAM, SORT_PARAM};

/// Default rows per page when a view does not declare one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Value shape accepted by a filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterKind {
    /// Free text such as a search box.
    Text,
    /// One value from a fixed whitelist.
    Choice {
        /// Accepted values.
        allowed: Vec<String>,
    },
    /// Non-negative integer.
    Number,
    /// Boolean toggle.
    Flag,
    /// Single calendar date.
    Date,
    /// Id resolved through a reference directory.
    Reference {
        /// Directory used to label the id.
        directory: DirectoryId,
    },
    /// Repeated values (`key=a&key=b`).
    Many {
        /// Optional whitelist for the elements.
        allowed: Option<Vec<String>>,
    },
    /// Inclusive date range stored in two parameters; defaults to the current
    /// month on a page's first reconciliation.
    DateRange {
        /// URL parameter holding the end date (the key holds the start).
        end_param: String,
        /// Request field holding the end date.
        end_wire: String,
    },
}

/// Whether a filter carries one value or a set of values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Multiplicity {
    /// `key=value`.
    Single,
    /// `key=value1&key=value2`.
    Multi,
}

impl FilterKind {
    /// Multiplicity implied by the kind.
    #[must_use]
    pub const fn multiplicity(&self) -> Multiplicity {
        match self {
            Self::Many { .. } => Multiplicity::Multi,
            _ => Multiplicity::Single,
        }
    }
}

/// Declaration of one filter on a list view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterDescriptor {
    key: String,
    wire_name: String,
    kind: FilterKind,
    affects_page: bool,
}

impl FilterDescriptor {
    fn new(key: &str, kind: FilterKind) -> Self {
        Self {
            key: key.to_string(),
            wire_name: key.to_string(),
            kind,
            affects_page: true,
        }
    }

    /// Free-text filter.
    #[must_use]
    pub fn text(key: &str) -> Self {
        Self::new(key, FilterKind::Text)
    }

    /// Whitelisted single-choice filter.
    #[must_use]
    pub fn choice(key: &str, allowed: &[&str]) -> Self {
        Self::new(
            key,
            FilterKind::Choice {
                allowed: allowed.iter().map(|value| (*value).to_string()).collect(),
            },
        )
    }

    /// Non-negative integer filter.
    #[must_use]
    pub fn number(key: &str) -> Self {
        Self::new(key, FilterKind::Number)
    }

    /// Boolean filter.
    #[must_use]
    pub fn flag(key: &str) -> Self {
        Self::new(key, FilterKind::Flag)
    }

    /// Single-date filter.
    #[must_use]
    pub fn date(key: &str) -> Self {
        Self::new(key, FilterKind::Date)
    }

    /// Id filter labelled through `directory`.
    #[must_use]
    pub fn reference(key: &str, directory: &str) -> Self {
        Self::new(
            key,
            FilterKind::Reference {
                directory: DirectoryId::new(directory),
            },
        )
    }

    /// Multi-value filter without a whitelist.
    #[must_use]
    pub fn many(key: &str) -> Self {
        Self::new(key, FilterKind::Many { allowed: None })
    }

    /// Multi-value filter restricted to `allowed`.
    #[must_use]
    pub fn many_of(key: &str, allowed: &[&str]) -> Self {
        Self::new(
            key,
            FilterKind::Many {
                allowed: Some(allowed.iter().map(|value| (*value).to_string()).collect()),
            },
        )
    }

    /// Date range stored under `start_key` and `end_key`.
    #[must_use]
    pub fn date_range(start_key: &str, end_key: &str) -> Self {
        Self::new(
            start_key,
            FilterKind::DateRange {
                end_param: end_key.to_string(),
                end_wire: end_key.to_string(),
            },
        )
    }

    /// Override the request field name (the start field for date ranges).
    #[must_use]
    pub fn wire(mut self, name: &str) -> Self {
        self.wire_name = name.to_string();
        self
    }

    /// Override the request field holding a date range's end.
    #[must_use]
    pub fn wire_end(mut self, name: &str) -> Self {
        if let FilterKind::DateRange { end_wire, .. } = &mut self.kind {
            *end_wire = name.to_string();
        }
        self
    }

    /// Keep the current page when this filter changes.
    #[must_use]
    pub fn keep_page(mut self) -> Self {
        self.affects_page = false;
        self
    }

    /// Filter key; also the URL parameter and the cache key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Request field name.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Declared value shape.
    #[must_use]
    pub const fn kind(&self) -> &FilterKind {
        &self.kind
    }

    /// Whether changing this filter resets pagination.
    #[must_use]
    pub const fn affects_page(&self) -> bool {
        self.affects_page
    }

    /// Single or multi valued.
    #[must_use]
    pub const fn multiplicity(&self) -> Multiplicity {
        self.kind.multiplicity()
    }

    /// Directory labelling this filter, if it is id-valued.
    #[must_use]
    pub const fn directory(&self) -> Option<&DirectoryId> {
        match &self.kind {
            FilterKind::Reference { directory } => Some(directory),
            _ => None,
        }
    }

    /// Whether the kind is a date range.
    #[must_use]
    pub const fn is_date_range(&self) -> bool {
        matches!(self.kind, FilterKind::DateRange { .. })
    }

    /// URL parameters owned by this filter.
    #[must_use]
    pub fn params(&self) -> Vec<&str> {
        match &self.kind {
            FilterKind::DateRange { end_param, .. } => vec![self.key.as_str(), end_param.as_str()],
            _ => vec![self.key.as_str()],
        }
    }

    /// Request field names produced by this filter.
    #[must_use]
    pub fn wire_names(&self) -> Vec<&str> {
        match &self.kind {
            FilterKind::DateRange { end_wire, .. } => vec![self.wire_name.as_str(), end_wire.as_str()],
            _ => vec![self.wire_name.as_str()],
        }
    }

    /// Whether `query` mentions any parameter of this filter.
    #[must_use]
    pub fn present_in(&self, query: &Query) -> bool {
        self.params().into_iter().any(|param| query.contains(param))
    }

    /// Raw parameters of this filter, copied out of `query`.
    #[must_use]
    pub fn raw_fragment(&self, query: &Query) -> Query {
        query.select(&self.params())
    }

    /// Decode this filter's value from `query`; malformed input is absent.
    ///
    /// Reference ids come back unlabelled; see [`FilterDescriptor::resolve`].
    #[must_use]
    pub fn decode(&self, query: &Query) -> Option<FilterValue> {
        let single = query.get(&self.key);
        match &self.kind {
            FilterKind::Text => decode::text(single).map(FilterValue::Text),
            FilterKind::Choice { allowed } => {
                decode::choice(single, allowed).map(FilterValue::Choice)
            }
            FilterKind::Number => decode::number(single).map(FilterValue::Number),
            FilterKind::Flag => decode::flag(single).map(FilterValue::Flag),
            FilterKind::Date => decode::date(single).map(FilterValue::Date),
            FilterKind::Reference { .. } => decode::reference_id(single)
                .map(|id| FilterValue::Reference(DirectoryEntry::unlabelled(id))),
            FilterKind::Many { allowed } => {
                decode::many(&query.get_all(&self.key), allowed.as_deref()).map(FilterValue::Many)
            }
            FilterKind::DateRange { end_param, .. } => {
                decode::date_range(single, query.get(end_param)).map(FilterValue::DateRange)
            }
        }
    }

    /// Replace an unlabelled reference with its directory entry when known.
    #[must_use]
    pub fn resolve(&self, value: FilterValue, directories: &Directories) -> FilterValue {
        match (&self.kind, value) {
            (FilterKind::Reference { directory }, FilterValue::Reference(entry)) => directories
                .resolve(directory, &entry.key)
                .map_or(FilterValue::Reference(entry), |found| {
                    FilterValue::Reference(found.clone())
                }),
            (_, value) => value,
        }
    }

    /// Whether an id value exists in this filter's (loaded) directory.
    /// Non-reference values always pass.
    #[must_use]
    pub fn exists_in(&self, value: &FilterValue, directories: &Directories) -> bool {
        match (&self.kind, value) {
            (FilterKind::Reference { directory }, FilterValue::Reference(entry)) => {
                directories.resolve(directory, &entry.key).is_some()
            }
            _ => true,
        }
    }

    /// Append the canonical parameters for `value` to `query`.
    pub fn encode(&self, value: &FilterValue, query: &mut Query) {
        match (value, &self.kind) {
            (FilterValue::Text(text) | FilterValue::Choice(text), _) => {
                query.append(&self.key, text.as_str());
            }
            (FilterValue::Number(number), _) => query.append(&self.key, number.to_string()),
            (FilterValue::Flag(flag), _) => query.append(&self.key, flag.to_string()),
            (FilterValue::Date(date), _) => query.append(&self.key, format_date(*date)),
            (FilterValue::Reference(entry), _) => query.append(&self.key, entry.key.as_str()),
            (FilterValue::Many(values), _) => {
                for value in values {
                    query.append(&self.key, value.as_str());
                }
            }
            (FilterValue::DateRange(range), FilterKind::DateRange { end_param, .. }) => {
                query.append(&self.key, format_date(range.from));
                query.append(end_param, format_date(range.to));
            }
            (FilterValue::DateRange(_), _) => {}
        }
    }

    /// Canonical parameters for `value` as a standalone fragment.
    #[must_use]
    pub fn fragment(&self, value: &FilterValue) -> Query {
        let mut query = Query::new();
        self.encode(value, &mut query);
        query
    }

    /// Delete every parameter of this filter from `query`.
    pub fn remove_from(&self, query: &mut Query) {
        for param in self.params() {
            query.remove(param);
        }
    }

    /// Request fields for `value`.
    #[must_use]
    pub fn wire_entries(&self, value: &FilterValue) -> Vec<(String, WireValue)> {
        let wire = self.wire_name.clone();
        match (value, &self.kind) {
            (FilterValue::Text(text) | FilterValue::Choice(text), _) => {
                vec![(wire, WireValue::Text(text.clone()))]
            }
            (FilterValue::Number(number), _) => vec![(wire, WireValue::Number(*number))],
            (FilterValue::Flag(flag), _) => vec![(wire, WireValue::Flag(*flag))],
            (FilterValue::Date(date), _) => vec![(wire, WireValue::Text(format_date(*date)))],
            (FilterValue::Reference(entry), _) => vec![(wire, WireValue::Text(entry.key.clone()))],
            (FilterValue::Many(values), _) => vec![(wire, WireValue::List(values.clone()))],
            (FilterValue::DateRange(range), FilterKind::DateRange { end_wire, .. }) => vec![
                (wire, WireValue::Text(format_date(range.from))),
                (end_wire.clone(), WireValue::Text(format_date(range.to))),
            ],
            (FilterValue::DateRange(_), _) => Vec::new(),
        }
    }

    /// First-load default: the calendar month containing `today`, for date ranges only.
    #[must_use]
    pub fn first_load_default(&self, today: NaiveDate) -> Option<FilterValue> {
        self.is_date_range()
            .then(|| FilterValue::DateRange(DateRange::month_of(today)))
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Static declaration of one list page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSpec {
    list_key: String,
    endpoint: String,
    page_size: u32,
    filters: Vec<FilterDescriptor>,
    sortable: Vec<String>,
    polls: bool,
}

impl ViewSpec {
    /// Start declaring a view namespaced under `list_key`.
    #[must_use]
    pub fn builder(list_key: &str) -> ViewSpecBuilder {
        ViewSpecBuilder {
            list_key: list_key.to_string(),
            endpoint: None,
            page_size: DEFAULT_PAGE_SIZE,
            filters: Vec::new(),
            sortable: Vec::new(),
            polls: false,
        }
    }

    /// Key namespacing this view's cached params.
    #[must_use]
    pub fn list_key(&self) -> &str {
        &self.list_key
    }

    /// Remote list endpoint path.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fixed rows per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Filters in reconciliation priority order.
    #[must_use]
    pub fn filters(&self) -> &[FilterDescriptor] {
        &self.filters
    }

    /// Columns accepted in the `sort` parameter.
    #[must_use]
    pub fn sortable(&self) -> &[String] {
        &self.sortable
    }

    /// Whether the list re-fetches on a fixed interval.
    #[must_use]
    pub const fn polls(&self) -> bool {
        self.polls
    }

    /// Descriptor for `key`, if declared.
    #[must_use]
    pub fn filter(&self, key: &str) -> Option<&FilterDescriptor> {
        self.filters.iter().find(|descriptor| descriptor.key == key)
    }

    /// Copy of this view with another page size.
    ///
    /// # Errors
    /// Returns [`FilterError::InvalidPageSize`] when `page_size` is zero.
    pub fn with_page_size(&self, page_size: u32) -> FilterResult<Self> {
        if page_size == 0 {
            return Err(FilterError::InvalidPageSize {
                view: self.list_key.clone(),
                page_size,
            });
        }
        Ok(Self {
            page_size,
            ..self.clone()
        })
    }

    /// Every directory any filter of this view may need.
    #[must_use]
    pub fn reference_directories(&self) -> BTreeSet<DirectoryId> {
        self.filters
            .iter()
            .filter_map(FilterDescriptor::directory)
            .cloned()
            .collect()
    }

    /// Directories that must be loaded before reconciling: those of id filters
    /// that currently carry a URL or cached value.
    #[must_use]
    pub fn required_directories(
        &self,
        url: &Query,
        cached: Option<&CachedParams>,
    ) -> BTreeSet<DirectoryId> {
        self.filters
            .iter()
            .filter(|descriptor| {
                descriptor.present_in(url)
                    || cached.is_some_and(|cached| cached.contains_key(descriptor.key()))
            })
            .filter_map(FilterDescriptor::directory)
            .cloned()
            .collect()
    }
}

/// Builder validating a [`ViewSpec`].
#[derive(Clone, Debug)]
pub struct ViewSpecBuilder {
    list_key: String,
    endpoint: Option<String>,
    page_size: u32,
    filters: Vec<FilterDescriptor>,
    sortable: Vec<String>,
    polls: bool,
}

impl ViewSpecBuilder {
    /// Remote list endpoint (defaults to `/<list_key>`).
    #[must_use]
    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    /// Fixed rows per page.
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Append a filter; declaration order is reconciliation priority.
    #[must_use]
    pub fn filter(mut self, descriptor: FilterDescriptor) -> Self {
        self.filters.push(descriptor);
        self
    }

    /// Columns accepted in the `sort` parameter.
    #[must_use]
    pub fn sortable(mut self, columns: &[&str]) -> Self {
        self.sortable = columns.iter().map(|column| (*column).to_string()).collect();
        self
    }

    /// Re-fetch on the configured poll interval.
    #[must_use]
    pub fn polling(mut self) -> Self {
        self.polls = true;
        self
    }

    /// Validate and freeze the declaration.
    ///
    /// # Errors
    /// Returns a [`FilterError`] when keys, parameters or wire names collide,
    /// claim a reserved name, a whitelist is empty, or the page size is zero.
    pub fn build(self) -> FilterResult<ViewSpec> {
        let view = self.list_key.trim().to_string();
        if view.is_empty() {
            return Err(FilterError::EmptyListKey);
        }
        if self.page_size == 0 {
            return Err(FilterError::InvalidPageSize {
                view,
                page_size: self.page_size,
            });
        }

        let mut keys = HashSet::new();
        let mut params = HashSet::new();
        let mut wires = HashSet::new();
        for descriptor in &self.filters {
            if !keys.insert(descriptor.key()) {
                return Err(FilterError::DuplicateFilter {
                    view,
                    key: descriptor.key.clone(),
                });
            }
            for param in descriptor.params() {
                if param == PAGE_PARAM || param == SORT_PARAM {
                    return Err(FilterError::ReservedName {
                        view,
                        name: param.to_string(),
                    });
                }
                if !params.insert(param) {
                    return Err(FilterError::DuplicateParam {
                        view,
                        param: param.to_string(),
                    });
                }
            }
            for wire in descriptor.wire_names() {
                if RESERVED_WIRE_NAMES.contains(&wire) {
                    return Err(FilterError::ReservedName {
                        view,
                        name: wire.to_string(),
                    });
                }
                if !wires.insert(wire) {
                    return Err(FilterError::DuplicateWireName {
                        view,
                        wire_name: wire.to_string(),
                    });
                }
            }
            let empty_whitelist = match &descriptor.kind {
                FilterKind::Choice { allowed } => allowed.is_empty(),
                FilterKind::Many {
                    allowed: Some(allowed),
                } => allowed.is_empty(),
                _ => false,
            };
            if empty_whitelist {
                return Err(FilterError::EmptyWhitelist {
                    view,
                    key: descriptor.key.clone(),
                });
            }
        }

        let endpoint = self.endpoint.unwrap_or_else(|| format!("/{view}"));
        Ok(ViewSpec {
            list_key: view,
            endpoint,
            page_size: self.page_size,
            filters: self.filters,
            sortable: self.sortable,
            polls: self.polls,
        })
    }
}
