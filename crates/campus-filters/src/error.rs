//! Error types raised while declaring list views.
//!
//! Decoding, reconciliation and mutation are total; the only fallible step is
//! building a [`crate::ViewSpec`] whose declarations contradict each other.

use thiserror::Error;

/// Primary error type for view declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The list key used to namespace cached params was empty.
    #[error("list view key must not be empty")]
    EmptyListKey,
    /// Page size must be positive.
    #[error("invalid page size")]
    InvalidPageSize {
        /// View declaring the page size.
        view: String,
        /// Offending page size.
        page_size: u32,
    },
    /// Two descriptors share the same filter key.
    #[error("duplicate filter key")]
    DuplicateFilter {
        /// View declaring the filters.
        view: String,
        /// Repeated filter key.
        key: String,
    },
    /// Two descriptors contend over the same URL parameter.
    #[error("duplicate query parameter")]
    DuplicateParam {
        /// View declaring the filters.
        view: String,
        /// Repeated URL parameter name.
        param: String,
    },
    /// Two descriptors map onto the same request field.
    #[error("duplicate wire name")]
    DuplicateWireName {
        /// View declaring the filters.
        view: String,
        /// Repeated request field name.
        wire_name: String,
    },
    /// A filter tried to claim a name owned by pagination, sort or the request envelope.
    #[error("reserved name used by filter")]
    ReservedName {
        /// View declaring the filter.
        view: String,
        /// Reserved name that was claimed.
        name: String,
    },
    /// A whitelist-backed filter declared no allowed values.
    #[error("filter whitelist is empty")]
    EmptyWhitelist {
        /// View declaring the filter.
        view: String,
        /// Filter key with the empty whitelist.
        key: String,
    },
    /// A catalog lookup named a view that is not declared.
    #[error("unknown list view")]
    UnknownView {
        /// Requested list key.
        view: String,
    },
}

/// Convenience alias for view declaration results.
pub type FilterResult<T> = Result<T, FilterError>;
