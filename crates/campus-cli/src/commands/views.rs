use std::ops::Deref;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult};
use crate::output::render_views;

pub(crate) fn handle_views(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    render_views(ctx.catalog.views().map(Deref::deref), format)
}
