//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use campus_fetch::ListSnapshot;
use campus_filters::{
    FilterKind, FilterValue, ListRequest, ListState, Phase, Reconciliation, ViewSpec,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

/// Outcome of settling a URL, as printed by `reconcile`.
#[derive(Debug, Serialize)]
pub(crate) struct SettleReport {
    pub(crate) view: String,
    pub(crate) url: String,
    pub(crate) redirects: Vec<String>,
    pub(crate) adopted_from_cache: Vec<String>,
    pub(crate) defaulted: Vec<String>,
    pub(crate) purged: Vec<String>,
    pub(crate) state: ListState,
    pub(crate) request: Option<ListRequest>,
}

impl SettleReport {
    pub(crate) fn absorb(&mut self, reconciliation: &Reconciliation) {
        extend_unique(&mut self.adopted_from_cache, &reconciliation.adopted_from_cache);
        extend_unique(&mut self.defaulted, &reconciliation.defaulted);
        extend_unique(&mut self.purged, &reconciliation.purged);
    }
}

fn extend_unique(target: &mut Vec<String>, keys: &[String]) {
    for key in keys {
        if !target.contains(key) {
            target.push(key.clone());
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_views<'a>(
    views: impl Iterator<Item = &'a ViewSpec>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let views: Vec<Value> = views.map(view_json).collect();
            print_json(&views)?;
        }
        OutputFormat::Table => {
            println!("{:<18} {:<20} {:>5} {:<5} FILTERS", "VIEW", "ENDPOINT", "SIZE", "POLL");
            for view in views {
                let filters: Vec<String> = view
                    .filters()
                    .iter()
                    .map(|filter| filter_label(filter.key(), filter.kind()))
                    .collect();
                println!(
                    "{:<18} {:<20} {:>5} {:<5} {}",
                    view.list_key(),
                    view.endpoint(),
                    view.page_size(),
                    yes_no(view.polls()),
                    filters.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn view_json(view: &ViewSpec) -> Value {
    let filters: Vec<Value> = view
        .filters()
        .iter()
        .map(|filter| {
            json!({
                "key": filter.key(),
                "kind": kind_label(filter.kind()),
                "params": filter.params(),
                "wire": filter.wire_names(),
                "resets_page": filter.affects_page(),
            })
        })
        .collect();
    json!({
        "list_key": view.list_key(),
        "endpoint": view.endpoint(),
        "page_size": view.page_size(),
        "polls": view.polls(),
        "sortable": view.sortable(),
        "filters": filters,
    })
}

pub(crate) fn render_report(report: &SettleReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("view: {}", report.view);
            println!("url: ?{}", report.url);
            for href in &report.redirects {
                println!("redirect: {href}");
            }
            print_keys("adopted from cache", &report.adopted_from_cache);
            print_keys("defaulted", &report.defaulted);
            print_keys("purged", &report.purged);
            print_state(&report.state);
            match &report.request {
                Some(request) => print_request_pairs(request),
                None => println!("request: <not settled>"),
            }
        }
    }
    Ok(())
}

pub(crate) fn render_request(request: &ListRequest, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(request)?,
        OutputFormat::Table => print_request_pairs(request),
    }
    Ok(())
}

pub(crate) fn render_navigation(
    href: &str,
    phase: Phase,
    request: Option<&ListRequest>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "href": href,
            "phase": phase,
            "request": request,
        }))?,
        OutputFormat::Table => {
            println!("navigate: {href}");
            if let Some(request) = request {
                print_request_pairs(request);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_snapshot(
    view: &str,
    snapshot: &ListSnapshot<Value>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "view": view,
            "generation": snapshot.generation,
            "total": snapshot.total,
            "rows": snapshot.data,
            "error": snapshot.error.as_ref().map(|err| json!({
                "message": err.to_string(),
                "detail": err.detail(),
            })),
        }))?,
        OutputFormat::Table => {
            if let Some(err) = &snapshot.error {
                let detail = err.detail().map(|detail| format!(": {detail}")).unwrap_or_default();
                println!("#{} {view} error: {err}{detail}", snapshot.generation);
            } else {
                println!(
                    "#{} {view} {} of {} rows",
                    snapshot.generation,
                    snapshot.data.len(),
                    snapshot.total
                );
                for row in &snapshot.data {
                    println!("  {}", row_summary(row));
                }
            }
        }
    }
    Ok(())
}

fn print_keys(label: &str, keys: &[String]) {
    if !keys.is_empty() {
        println!("{label}: {}", keys.join(", "));
    }
}

fn print_state(state: &ListState) {
    for (key, value) in state.filters.iter() {
        println!("filter {key}: {}", value_label(value));
    }
    println!(
        "page: {} (size {})",
        state.pagination.page_index, state.pagination.page_size
    );
    if !state.sort.is_empty() {
        println!("sort: {}", state.sort.to_params().join(", "));
    }
}

fn print_request_pairs(request: &ListRequest) {
    let pairs: Vec<String> = request
        .query_pairs()
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    println!("request: {}", pairs.join("&"));
}

pub(crate) fn value_label(value: &FilterValue) -> String {
    match value {
        FilterValue::Text(text) | FilterValue::Choice(text) => text.clone(),
        FilterValue::Number(number) => number.to_string(),
        FilterValue::Flag(flag) => flag.to_string(),
        FilterValue::Date(date) => date.to_string(),
        FilterValue::Reference(entry) if entry.key == entry.value => entry.key.clone(),
        FilterValue::Reference(entry) => format!("{} ({})", entry.value, entry.key),
        FilterValue::Many(values) => values.join(", "),
        FilterValue::DateRange(range) => format!("{}..{}", range.from, range.to),
    }
}

fn row_summary(row: &Value) -> String {
    let text = row.to_string();
    if text.chars().count() > 100 {
        let truncated: String = text.chars().take(97).collect();
        format!("{truncated}...")
    } else {
        text
    }
}

fn filter_label(key: &str, kind: &FilterKind) -> String {
    format!("{key}:{}", kind_label(kind))
}

const fn kind_label(kind: &FilterKind) -> &'static str {
    match kind {
        FilterKind::Text => "text",
        FilterKind::Choice { .. } => "choice",
        FilterKind::Number => "number",
        FilterKind::Flag => "flag",
        FilterKind::Date => "date",
        FilterKind::Reference { .. } => "reference",
        FilterKind::Many { .. } => "many",
        FilterKind::DateRange { .. } => "date-range",
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use campus_filters::{DateRange, DirectoryEntry};
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn references_show_their_label_when_known() {
        assert_eq!(
            value_label(&FilterValue::Reference(DirectoryEntry::new("2", "South High"))),
            "South High (2)"
        );
        assert_eq!(
            value_label(&FilterValue::Reference(DirectoryEntry::unlabelled("2"))),
            "2"
        );
    }

    #[test]
    fn date_ranges_render_as_spans() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        assert_eq!(
            value_label(&FilterValue::DateRange(DateRange::month_of(day))),
            "2026-10-01..2026-10-31"
        );
    }

    #[test]
    fn long_rows_are_truncated() {
        let row = json!({ "note": "x".repeat(200) });
        let summary = row_summary(&row);
        assert_eq!(summary.chars().count(), 100);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn reports_merge_keys_across_passes() {
        let mut report = SettleReport {
            view: "users".into(),
            url: String::new(),
            redirects: Vec::new(),
            adopted_from_cache: vec!["role".into()],
            defaulted: Vec::new(),
            purged: Vec::new(),
            state: ListState {
                filters: campus_filters::FilterSet::new(),
                pagination: campus_filters::PaginationState::first(20),
                sort: campus_filters::SortState::none(),
            },
            request: None,
        };
        extend_unique(&mut report.adopted_from_cache, &["role".into(), "search".into()]);
        assert_eq!(report.adopted_from_cache, vec!["role", "search"]);
    }
}
