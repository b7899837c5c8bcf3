//! Argument parsing and command dispatch for the campus CLI.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::Url;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, parse_url};
use crate::commands::mutate::handle_mutate;
use crate::commands::reconcile::{handle_reconcile, handle_request};
use crate::commands::views::handle_views;
use crate::commands::watch::handle_watch;

/// Build identifier stamped at compile time through `CAMPUS_BUILD_SHA`.
pub(crate) const BUILD_SHA: &str = match option_env!("CAMPUS_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Parses CLI arguments, installs logging, and executes the requested command.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();
    let ctx = match AppContext::from_cli(&cli, &trace_id) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    if let Err(err) = campus_telemetry::init_logging(&ctx.config.logging(BUILD_SHA)) {
        eprintln!("warning: logging disabled: {err}");
    }
    let span = tracing::info_span!(
        "campus",
        trace_id = %trace_id,
        build_sha = campus_telemetry::build_sha(),
        command = command_label(&cli.command),
    );
    tracing::debug!(parent: &span, "dispatching");

    match dispatch(cli, &ctx).instrument(span).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli, ctx: &AppContext) -> CliResult<()> {
    match cli.command {
        Command::Views => handle_views(ctx, cli.output),
        Command::Reconcile(args) => handle_reconcile(ctx, args, cli.output).await,
        Command::Request(args) => handle_request(ctx, args, cli.output).await,
        Command::Mutate(args) => handle_mutate(ctx, args, cli.output).await,
        Command::Watch(args) => handle_watch(ctx, args, cli.output).await,
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Views => "views",
        Command::Reconcile(_) => "reconcile",
        Command::Request(_) => "request",
        Command::Mutate(_) => "mutate",
        Command::Watch(_) => "watch",
    }
}

#[derive(Parser)]
#[command(name = "campus", about = "Drive the console's list filter engine from a terminal")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "CAMPUS_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "CAMPUS_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(long, global = true, help = "Engine configuration file (JSON)")]
    pub(crate) config: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List the declared views and their filters.
    Views,
    /// Reconcile a URL against the cache and report the outcome.
    Reconcile(RouteArgs),
    /// Print the list request a settled URL produces.
    Request(RouteArgs),
    /// Apply filter, sort, or page changes and print the next URL.
    Mutate(MutateArgs),
    /// Fetch a settled view and follow its poll cycle.
    Watch(WatchArgs),
}

#[derive(Args, Clone, Debug)]
pub(crate) struct RouteArgs {
    #[arg(help = "List key of the view, e.g. users")]
    pub(crate) view: String,
    #[arg(long, default_value = "", help = "Query string of the current location")]
    pub(crate) url: String,
    #[arg(long, help = "Cache snapshot to restore filters from")]
    pub(crate) cache: Option<PathBuf>,
    #[arg(long, help = "Write the cache back after the command")]
    pub(crate) save_cache: bool,
    #[arg(long, help = "Directories file used instead of fetching from the API")]
    pub(crate) directories: Option<PathBuf>,
    #[arg(long, help = "Date used for first-load defaults (YYYY-MM-DD)")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct MutateArgs {
    #[command(flatten)]
    pub(crate) route: RouteArgs,
    #[arg(
        long = "set",
        value_parser = parse_assignment,
        help = "Set a filter as key=value; repeat a key for multi-value filters"
    )]
    pub(crate) set: Vec<(String, String)>,
    #[arg(long = "clear", help = "Clear a filter by key")]
    pub(crate) clear: Vec<String>,
    #[arg(long, help = "Move to a zero-based page")]
    pub(crate) page: Option<u32>,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Sort columns; prefix with '-' for descending"
    )]
    pub(crate) sort: Option<Vec<String>>,
    #[arg(long, help = "Clear every filter and the sort first")]
    pub(crate) clear_all: bool,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    pub(crate) route: RouteArgs,
    #[arg(long, help = "Stop after this many published results")]
    pub(crate) updates: Option<usize>,
    #[arg(long, help = "Print fetch counters on exit")]
    pub(crate) metrics: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Parse a `key=value` filter assignment.
pub(crate) fn parse_assignment(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing filter key in '{input}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
