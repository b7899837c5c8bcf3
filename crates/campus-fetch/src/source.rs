//! Remote collaborators consumed by the scheduler and the directory loader.

use std::collections::BTreeMap;

use async_trait::async_trait;
use campus_filters::{DirectoryEntry, DirectoryId, ListRequest};
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage<T> {
    /// Rows of the requested page.
    pub data: Vec<T>,
    /// Total rows matching the filters.
    pub total: u64,
}

impl<T> ListPage<T> {
    /// Page with no rows.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
        }
    }
}

/// Remote list API.
#[async_trait]
pub trait ListSource<T>: Send + Sync {
    /// Fetch one page from `endpoint`.
    async fn fetch(&self, endpoint: &str, request: &ListRequest) -> FetchResult<ListPage<T>>;
}

/// Page request sent to a directory source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryQuery {
    /// Page size.
    pub limit: u32,
    /// Row offset.
    pub offset: u64,
    /// Extra scoping parameters (for example `school_id`).
    #[serde(flatten)]
    pub scoping: BTreeMap<String, String>,
}

/// Remote reference directory.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Fetch one page of entries for `directory`.
    async fn fetch_page(
        &self,
        directory: &DirectoryId,
        query: &DirectoryQuery,
    ) -> FetchResult<Vec<DirectoryEntry>>;
}
