#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Filter-state synchronisation for the console's list views.
//!
//! Every list page keeps three sources of truth in step: the browser query
//! string, a session-scoped cache of the last filters used per view, and the
//! page's local state. This crate holds the pure side of that engine.
//!
//! Layout:
//! - `query.rs`: ordered query-string multimap (URL state, cached raw params)
//! - `decode.rs`: total decoders from raw values to typed values
//! - `descriptor.rs`: per-view filter declarations (`FilterDescriptor`, `ViewSpec`)
//! - `filter_set.rs`: `FilterSet`, pagination, sort, and the canonical codec
//! - `cache.rs`: the `ParamCache` reducer
//! - `directory.rs`: reference directories used to label id filters
//! - `reconcile.rs`: URL + cache merge on route-ready
//! - `mutate.rs`: user-interaction handlers
//! - `request.rs`: the flat remote list request descriptor
//! - `catalog.rs`: the console's declared list views
//! - `session.rs`: per-mount facade tying the pieces together

pub mod cache;
pub mod catalog;
pub mod decode;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod filter_set;
pub mod mutate;
pub mod query;
pub mod reconcile;
pub mod request;
pub mod session;

pub use cache::{CacheAction, CachedParams, ParamCache, reduce};
pub use catalog::Catalog;
pub use descriptor::{
    DEFAULT_PAGE_SIZE, FilterDescriptor, FilterKind, Multiplicity, ViewSpec, ViewSpecBuilder,
};
pub use directory::{Directories, DirectoryEntry, DirectoryId};
pub use error::{FilterError, FilterResult};
pub use filter_set::{
    DateRange, FilterSet, FilterValue, ListState, PaginationState, SortKey, SortState,
    decode_state, encode_state,
};
pub use mutate::{FilterInput, Mutation, Mutator};
pub use query::Query;
pub use reconcile::{Navigation, Phase, ReconcileStep, Reconciler, Reconciliation, RouteState};
pub use request::{ListRequest, WireValue};
pub use session::ListSession;

/// Reserved query parameter carrying the zero-based page index.
pub const PAGE_PARAM: &str = "page";

/// Reserved query parameter carrying sort entries (`field` or `-field`).
pub const SORT_PARAM: &str = "sort";
