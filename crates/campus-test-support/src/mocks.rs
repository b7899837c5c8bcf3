//! Fake list and directory sources that record what they were asked.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use campus_fetch::{
    DirectoryQuery, DirectorySource, FetchError, FetchResult, ListPage, ListSource,
};
use campus_filters::{DirectoryEntry, DirectoryId, ListRequest};

type Responder<T> = Box<dyn Fn(&ListRequest) -> FetchResult<ListPage<T>> + Send + Sync>;
type Delay = Box<dyn Fn(&ListRequest) -> Duration + Send + Sync>;

/// One call observed by a [`RecordingSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Endpoint the scheduler targeted.
    pub endpoint: String,
    /// Request sent.
    pub request: ListRequest,
}

/// [`ListSource`] that records every request and answers from a closure.
pub struct RecordingSource<T> {
    calls: Mutex<Vec<RecordedCall>>,
    respond: Responder<T>,
    delay: Delay,
}

impl<T> RecordingSource<T> {
    /// Source answering every request with `respond`, without delay.
    #[must_use]
    pub fn new(
        respond: impl Fn(&ListRequest) -> FetchResult<ListPage<T>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
            delay: Box::new(|_: &ListRequest| Duration::ZERO),
        }
    }

    /// Delay each answer by `delay(request)` (virtual time under a paused clock).
    #[must_use]
    pub fn with_delay(
        mut self,
        delay: impl Fn(&ListRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Box::new(delay);
        self
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Requests received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<ListRequest> {
        lock(&self.calls)
            .iter()
            .map(|call| call.request.clone())
            .collect()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl RecordingSource<String> {
    /// Source answering with a single row describing the request.
    #[must_use]
    pub fn echo() -> Self {
        Self::new(|request| {
            Ok(ListPage {
                data: vec![describe(request)],
                total: 1,
            })
        })
    }

    /// Source failing every request with `status`.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self::new(move |_| {
            Err(FetchError::Status {
                status,
                message: Some("unavailable".to_string()),
            })
        })
    }
}

#[async_trait]
impl<T> ListSource<T> for RecordingSource<T>
where
    T: Send + Sync,
{
    async fn fetch(&self, endpoint: &str, request: &ListRequest) -> FetchResult<ListPage<T>> {
        lock(&self.calls).push(RecordedCall {
            endpoint: endpoint.to_string(),
            request: request.clone(),
        });
        let delay = (self.delay)(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(request)
    }
}

impl<T> std::fmt::Debug for RecordingSource<T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RecordingSource")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

/// Compact `name=value&...` rendering of a request's query pairs.
#[must_use]
pub fn describe(request: &ListRequest) -> String {
    request
        .query_pairs()
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// [`DirectorySource`] serving fixed directories page by page.
#[derive(Debug, Default)]
pub struct StaticDirectorySource {
    directories: BTreeMap<DirectoryId, Vec<DirectoryEntry>>,
    queries: Mutex<Vec<(DirectoryId, DirectoryQuery)>>,
}

impl StaticDirectorySource {
    /// Empty source; unknown directories answer with `404`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory.
    #[must_use]
    pub fn with(mut self, id: &str, entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        self.directories
            .insert(DirectoryId::new(id), entries.into_iter().collect());
        self
    }

    /// Page queries received so far.
    #[must_use]
    pub fn queries(&self) -> Vec<(DirectoryId, DirectoryQuery)> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl DirectorySource for StaticDirectorySource {
    async fn fetch_page(
        &self,
        directory: &DirectoryId,
        query: &DirectoryQuery,
    ) -> FetchResult<Vec<DirectoryEntry>> {
        lock(&self.queries).push((directory.clone(), query.clone()));
        let entries = self
            .directories
            .get(directory)
            .ok_or_else(|| FetchError::Status {
                status: 404,
                message: Some(format!("unknown directory {directory}")),
            })?;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(entries.iter().skip(offset).take(limit).cloned().collect())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ListRequest {
        ListRequest {
            is_list: true,
            limit: 10,
            offset: 20,
            filters: BTreeMap::new(),
            sort: None,
        }
    }

    #[tokio::test]
    async fn recording_source_records_calls() {
        let source = RecordingSource::echo();
        let page = source.fetch("/people", &request()).await;
        assert_eq!(
            page.map(|page| page.data),
            Ok(vec!["is_list=true&limit=10&offset=20".to_string()])
        );
        assert_eq!(source.call_count(), 1);
        assert_eq!(source.calls()[0].endpoint, "/people");
    }

    #[tokio::test]
    async fn static_directory_source_pages_entries() {
        let source = StaticDirectorySource::new().with(
            "schools",
            [
                DirectoryEntry::new("1", "North High"),
                DirectoryEntry::new("2", "South High"),
                DirectoryEntry::new("3", "East High"),
            ],
        );
        let query = DirectoryQuery {
            limit: 2,
            offset: 2,
            scoping: BTreeMap::new(),
        };
        let page = source.fetch_page(&DirectoryId::new("schools"), &query).await;
        assert_eq!(page, Ok(vec![DirectoryEntry::new("3", "East High")]));

        let missing = source.fetch_page(&DirectoryId::new("rooms"), &query).await;
        assert!(matches!(missing, Err(FetchError::Status { status: 404, .. })));
        assert_eq!(source.queries().len(), 2);
    }
}
