use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use campus_fetch::{DirectoryLoader, FetchError};
use campus_filters::{
    Directories, DirectoryId, ListSession, ParamCache, Phase, Query, ReconcileStep, RouteState,
};
use chrono::Local;
use tracing::{debug, info};

use crate::cli::{OutputFormat, RouteArgs};
use crate::client::{AppContext, CliError, CliResult, read_cache, read_directories, write_cache};
use crate::http::HttpDirectorySource;
use crate::output::{SettleReport, render_report, render_request};

/// Route events fed to a page before giving up on a stable URL.
const MAX_PASSES: usize = 4;

/// Mounted page after its URL stopped redirecting.
pub(crate) struct Settled {
    pub(crate) session: ListSession,
    pub(crate) cache: ParamCache,
    pub(crate) directories: Directories,
    pub(crate) report: SettleReport,
}

pub(crate) async fn handle_reconcile(
    ctx: &AppContext,
    args: RouteArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let save_to = save_target(&args)?;
    let settled = settle(ctx, &args).await?;
    render_report(&settled.report, format)?;
    save(save_to, &settled.cache)
}

pub(crate) async fn handle_request(
    ctx: &AppContext,
    args: RouteArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let save_to = save_target(&args)?;
    let settled = settle(ctx, &args).await?;
    let request = settled.report.request.as_ref().ok_or_else(|| {
        CliError::failure(anyhow!("view '{}' did not settle", settled.report.view))
    })?;
    render_request(request, format)?;
    save(save_to, &settled.cache)
}

/// Mount `args.view`, then replay redirects until the reconciler reports a
/// stable URL. Reference directories come from `--directories` or the API.
pub(crate) async fn settle(ctx: &AppContext, args: &RouteArgs) -> CliResult<Settled> {
    let view = ctx.view(&args.view)?;
    let cache = read_cache(args.cache.as_deref())?;
    let directories = match &args.directories {
        Some(path) => read_directories(path)?,
        None => Directories::new(),
    };
    let url = Query::parse(&args.url);
    let session = ListSession::mount(Arc::clone(&view));
    let report = SettleReport {
        view: view.list_key().to_string(),
        url: url.to_string(),
        redirects: Vec::new(),
        adopted_from_cache: Vec::new(),
        defaulted: Vec::new(),
        purged: Vec::new(),
        state: session.state().clone(),
        request: None,
    };
    let mut settled = Settled {
        session,
        cache,
        directories,
        report,
    };
    settled.route_to(ctx, args, url).await?;
    Ok(settled)
}

impl Settled {
    /// Feed `url` as the page's location and follow redirects until stable.
    pub(crate) async fn route_to(
        &mut self,
        ctx: &AppContext,
        args: &RouteArgs,
        mut url: Query,
    ) -> CliResult<()> {
        let today = args.today.unwrap_or_else(|| Local::now().date_naive());
        let list_key = self.session.view().list_key().to_string();
        for pass in 1..=MAX_PASSES {
            let step = self.session.on_route_at(
                RouteState::Ready(&url),
                &mut self.cache,
                &self.directories,
                today,
            );
            match step {
                ReconcileStep::Deferred { missing, .. } => {
                    load_directories(ctx, args, &mut self.directories, &missing).await?;
                }
                ReconcileStep::Reconciled(reconciliation) => {
                    self.report.absorb(&reconciliation);
                    if let Some(navigation) = reconciliation.redirect {
                        ctx.metrics.inc_redirect(&list_key);
                        self.report.redirects.push(navigation.href());
                        url = navigation.query;
                    }
                }
            }
            if self.session.phase() == Phase::Stable {
                debug!(view = %list_key, passes = pass, "route settled");
                self.report.url = self.session.url().to_string();
                self.report.state = self.session.state().clone();
                self.report.request = self.session.request();
                return Ok(());
            }
        }
        Err(CliError::failure(anyhow!(
            "view '{list_key}' did not settle after {MAX_PASSES} route events"
        )))
    }
}

async fn load_directories(
    ctx: &AppContext,
    args: &RouteArgs,
    directories: &mut Directories,
    missing: &BTreeSet<DirectoryId>,
) -> CliResult<()> {
    let names: Vec<&str> = missing.iter().map(DirectoryId::as_str).collect();
    if args.directories.is_some() {
        return Err(CliError::validation(format!(
            "directories file does not provide: {}",
            names.join(", ")
        )));
    }
    info!(directories = ?names, "loading reference directories");
    let loader = DirectoryLoader::new(Arc::new(HttpDirectorySource::new(
        ctx.client.clone(),
        ctx.base_url.clone(),
    )));
    loader
        .load_missing(directories, missing)
        .await
        .map(|_| ())
        .map_err(|err| fetch_failure("failed to load reference directories", &err))
}

pub(crate) fn fetch_failure(context: &str, err: &FetchError) -> CliError {
    match err.detail() {
        Some(detail) => CliError::failure(anyhow!("{context}: {err}: {detail}")),
        None => CliError::failure(anyhow!("{context}: {err}")),
    }
}

/// Cache destination for `--save-cache`, which needs `--cache`.
pub(crate) fn save_target(args: &RouteArgs) -> CliResult<Option<&Path>> {
    match (args.save_cache, args.cache.as_deref()) {
        (false, _) => Ok(None),
        (true, Some(path)) => Ok(Some(path)),
        (true, None) => Err(CliError::validation("--save-cache requires --cache")),
    }
}

pub(crate) fn save(target: Option<&Path>, cache: &ParamCache) -> CliResult<()> {
    target.map_or(Ok(()), |path| write_cache(path, cache))
}
