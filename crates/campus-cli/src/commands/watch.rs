use std::sync::Arc;

use anyhow::anyhow;
use campus_fetch::{FetchScheduler, ListSource};
use serde_json::Value;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::info;

use crate::cli::{OutputFormat, WatchArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::reconcile::{save, save_target, settle};
use crate::http::HttpListSource;
use crate::output::render_snapshot;

/// Settle the route, then print each result the scheduler publishes.
///
/// Non-polling views stop after their first result unless `--updates` asks
/// for more; polling views run until interrupted.
pub(crate) async fn handle_watch(
    ctx: &AppContext,
    args: WatchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let save_to = save_target(&args.route)?;
    let settled = settle(ctx, &args.route).await?;
    let request = settled.report.request.clone().ok_or_else(|| {
        CliError::failure(anyhow!("view '{}' did not settle", settled.report.view))
    })?;
    let view = ctx.view(&args.route.view)?;
    let limit = args.updates.or_else(|| (!view.polls()).then_some(1));

    let source: Arc<dyn ListSource<Value>> = Arc::new(HttpListSource::new(
        ctx.client.clone(),
        ctx.base_url.clone(),
    ));
    let scheduler = FetchScheduler::spawn(
        Arc::clone(&view),
        ctx.config.schedule_policy(&view),
        source,
        Some(ctx.metrics.clone()),
    );
    let mut updates = WatchStream::from_changes(scheduler.subscribe());
    if !scheduler.schedule(request) {
        return Err(CliError::failure(anyhow!("fetch scheduler stopped early")));
    }
    info!(view = view.list_key(), polls = view.polls(), "watching list");

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut published = 0_usize;
    loop {
        tokio::select! {
            snapshot = updates.next() => {
                let Some(snapshot) = snapshot else {
                    break;
                };
                if snapshot.loading {
                    continue;
                }
                render_snapshot(view.list_key(), &snapshot, format)?;
                published += 1;
                if limit.is_some_and(|limit| published >= limit) {
                    break;
                }
            }
            _ = &mut interrupt => {
                info!(view = view.list_key(), "interrupted");
                break;
            }
        }
    }
    scheduler.unmount().await;

    if args.metrics {
        let text = ctx
            .metrics
            .render()
            .map_err(|err| CliError::failure(anyhow!("failed to render metrics: {err}")))?;
        print!("{text}");
    }
    save(save_to, &settled.cache)
}
