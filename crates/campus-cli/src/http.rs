//! HTTP list and directory sources backed by `reqwest`.

use async_trait::async_trait;
use campus_fetch::{
    DirectoryQuery, DirectorySource, FetchError, FetchResult, ListPage, ListSource,
};
use campus_filters::{DirectoryEntry, DirectoryId, ListRequest};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::api_url;

/// Issues `GET {api}{endpoint}` with the request as query parameters.
#[derive(Clone)]
pub(crate) struct HttpListSource {
    client: Client,
    base_url: Url,
}

impl HttpListSource {
    pub(crate) const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl ListSource<Value> for HttpListSource {
    async fn fetch(&self, endpoint: &str, request: &ListRequest) -> FetchResult<ListPage<Value>> {
        let url = resolve(&self.base_url, endpoint)?;
        debug!(%url, offset = request.offset, "requesting list page");
        let response = self
            .client
            .get(url)
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }
}

/// Reads `GET {api}/directories/{id}` pages shaped like list responses.
#[derive(Clone)]
pub(crate) struct HttpDirectorySource {
    client: Client,
    base_url: Url,
}

impl HttpDirectorySource {
    pub(crate) const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl DirectorySource for HttpDirectorySource {
    async fn fetch_page(
        &self,
        directory: &DirectoryId,
        query: &DirectoryQuery,
    ) -> FetchResult<Vec<DirectoryEntry>> {
        let url = resolve(&self.base_url, &format!("/directories/{directory}"))?;
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        let page: ListPage<DirectoryEntry> = decode(response).await?;
        Ok(page.data)
    }
}

fn resolve(base: &Url, path: &str) -> FetchResult<Url> {
    api_url(base, path).map_err(|err| FetchError::Transport {
        message: format!("invalid request URL for '{path}': {err}"),
    })
}

fn transport(err: reqwest::Error) -> FetchError {
    FetchError::Transport {
        message: err.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> FetchResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body = body.trim();
        return Err(FetchError::Status {
            status: status.as_u16(),
            message: (!body.is_empty()).then(|| body.to_string()),
        });
    }
    response.json::<T>().await.map_err(|err| FetchError::Decode {
        message: err.to_string(),
    })
}
