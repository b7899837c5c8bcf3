//! Loading reference directories before reconciliation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use campus_filters::{Directories, DirectoryEntry, DirectoryId};
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::source::{DirectoryQuery, DirectorySource};

/// Entries requested per directory page.
pub const DEFAULT_DIRECTORY_PAGE_SIZE: u32 = 100;

/// Pages fetched per directory before the load is abandoned.
pub const DEFAULT_DIRECTORY_PAGE_LIMIT: usize = 1_000;

/// Pages reference directories out of a [`DirectorySource`].
#[derive(Clone)]
pub struct DirectoryLoader {
    source: Arc<dyn DirectorySource>,
    page_size: u32,
    page_limit: usize,
    scoping: BTreeMap<String, String>,
}

impl DirectoryLoader {
    /// Loader reading from `source` with the default page size.
    #[must_use]
    pub fn new(source: Arc<dyn DirectorySource>) -> Self {
        Self {
            source,
            page_size: DEFAULT_DIRECTORY_PAGE_SIZE,
            page_limit: DEFAULT_DIRECTORY_PAGE_LIMIT,
            scoping: BTreeMap::new(),
        }
    }

    /// Override the page size; zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override how many pages one directory may take; zero is treated as one.
    #[must_use]
    pub fn with_page_limit(mut self, pages: usize) -> Self {
        self.page_limit = pages.max(1);
        self
    }

    /// Scope every directory request by `key=value` (for example a school).
    #[must_use]
    pub fn with_scope(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scoping.insert(key.into(), value.into());
        self
    }

    /// Fetch every entry of `directory`, following pages until a short one.
    ///
    /// # Errors
    ///
    /// Returns the first page failure reported by the source, or
    /// [`FetchError::Truncated`] when the directory is still returning full
    /// pages after the page limit. A partial directory is never returned.
    pub async fn fetch_all(&self, directory: &DirectoryId) -> FetchResult<Vec<DirectoryEntry>> {
        let mut entries = Vec::new();
        let mut query = DirectoryQuery {
            limit: self.page_size,
            offset: 0,
            scoping: self.scoping.clone(),
        };
        for _ in 0..self.page_limit {
            let page = self.source.fetch_page(directory, &query).await?;
            let full_page = usize::try_from(self.page_size).is_ok_and(|limit| page.len() >= limit);
            entries.extend(page);
            if !full_page {
                return Ok(entries);
            }
            query.offset += u64::from(self.page_size);
        }
        warn!(
            directory = %directory,
            entries = entries.len(),
            pages = self.page_limit,
            "directory page limit reached; discarding partial directory"
        );
        Err(FetchError::Truncated {
            directory: directory.to_string(),
            pages: self.page_limit,
        })
    }

    /// Load every directory of `required` that `directories` does not hold yet.
    ///
    /// Missing directories are marked loading first and fetched concurrently.
    /// Directories that fail stay in the loading state so a later call retries
    /// them. Returns how many directories were loaded.
    ///
    /// # Errors
    ///
    /// Returns the first failure once every fetch has finished; successful
    /// directories are stored regardless.
    pub async fn load_missing(
        &self,
        directories: &mut Directories,
        required: &BTreeSet<DirectoryId>,
    ) -> FetchResult<usize> {
        let missing = directories.missing(required);
        for id in &missing {
            directories.mark_loading(id.clone());
        }

        let results = join_all(missing.iter().map(|id| async move {
            let result = self.fetch_all(id).await;
            (id, result)
        }))
        .await;

        let mut loaded = 0;
        let mut first_error = None;
        for (id, result) in results {
            match result {
                Ok(entries) => {
                    debug!(directory = %id, entries = entries.len(), "directory loaded");
                    directories.load(id.clone(), entries);
                    loaded += 1;
                }
                Err(error) => {
                    warn!(directory = %id, error = %error, "directory load failed");
                    first_error.get_or_insert(error);
                }
            }
        }
        first_error.map_or(Ok(loaded), Err)
    }
}

impl std::fmt::Debug for DirectoryLoader {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DirectoryLoader")
            .field("page_size", &self.page_size)
            .field("page_limit", &self.page_limit)
            .field("scoping", &self.scoping)
            .finish_non_exhaustive()
    }
}
