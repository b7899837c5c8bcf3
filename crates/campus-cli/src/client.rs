//! Shared client utilities, error types, and input files for the CLI.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use campus_config::{ConfigError, EngineConfig};
use campus_filters::{
    CacheAction, Catalog, Directories, DirectoryEntry, ParamCache, Query, ViewSpec,
};
use campus_telemetry::Metrics;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};

use crate::cli::Cli;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::InvalidField {
                section,
                field,
                value,
                reason,
            } => {
                let value = value.map(|value| format!(" ('{value}')")).unwrap_or_default();
                Self::validation(format!("invalid {section}.{field}{value}: {reason}"))
            }
            other => Self::failure(anyhow!(other)),
        }
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) config: EngineConfig,
    pub(crate) catalog: Catalog,
    pub(crate) metrics: Metrics,
}

impl AppContext {
    /// Build the HTTP client, configuration and view catalog for `cli`.
    pub(crate) fn from_cli(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(cli.timeout))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        let config = campus_config::load(cli.config.as_deref())?;
        Self::new(client, cli.api_url.clone(), config)
    }

    pub(crate) fn new(client: Client, base_url: Url, config: EngineConfig) -> CliResult<Self> {
        let catalog = Catalog::standard()
            .map_err(|err| CliError::failure(anyhow!("view catalog is inconsistent: {err}")))?;
        let catalog = config.apply_page_sizes(catalog)?;
        let metrics = Metrics::new()
            .map_err(|err| CliError::failure(anyhow!("failed to build metrics registry: {err}")))?;
        Ok(Self {
            client,
            base_url,
            config,
            catalog,
            metrics,
        })
    }

    /// Declared view for `list_key`.
    pub(crate) fn view(&self, list_key: &str) -> CliResult<Arc<ViewSpec>> {
        self.catalog.get(list_key).map_err(|_| {
            CliError::validation(format!(
                "unknown view '{list_key}'; run `campus views` to list them"
            ))
        })
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Join an API path onto the base URL, keeping any base path prefix.
pub(crate) fn api_url(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}").parse()
}

/// Read a cache snapshot shaped as `{list_key: {filter_key: raw_query}}`.
pub(crate) fn read_cache(path: Option<&Path>) -> CliResult<ParamCache> {
    let mut cache = ParamCache::new();
    let Some(path) = path else {
        return Ok(cache);
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read cache snapshot {}", path.display()))
        .map_err(CliError::failure)?;
    let lists: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(&text)
        .map_err(|err| CliError::validation(format!("invalid cache snapshot: {err}")))?;
    for (list_key, entries) in lists {
        for (key, raw) in entries {
            cache.dispatch(
                &list_key,
                &CacheAction::SetFilter {
                    key,
                    raw: Query::parse(&raw),
                },
            );
        }
    }
    Ok(cache)
}

/// Write `cache` in the shape [`read_cache`] accepts.
pub(crate) fn write_cache(path: &Path, cache: &ParamCache) -> CliResult<()> {
    let lists: BTreeMap<&str, BTreeMap<&str, String>> = cache
        .lists()
        .map(|(list_key, params)| {
            let entries: BTreeMap<&str, String> = params
                .iter()
                .map(|(key, raw)| (key.as_str(), raw.to_string()))
                .collect();
            (list_key, entries)
        })
        .collect();
    let text = serde_json::to_string_pretty(&lists)
        .map_err(|err| CliError::failure(anyhow!("failed to format cache snapshot: {err}")))?;
    fs::write(path, text)
        .with_context(|| format!("failed to write cache snapshot {}", path.display()))
        .map_err(CliError::failure)
}

/// Read directories shaped as `{directory: [{key, value}]}`.
pub(crate) fn read_directories(path: &Path) -> CliResult<Directories> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read directories {}", path.display()))
        .map_err(CliError::failure)?;
    let directories: BTreeMap<String, Vec<DirectoryEntry>> = serde_json::from_str(&text)
        .map_err(|err| CliError::validation(format!("invalid directories file: {err}")))?;
    Ok(directories
        .into_iter()
        .fold(Directories::new(), |loaded, (id, entries)| {
            loaded.with(&id, entries)
        }))
}
