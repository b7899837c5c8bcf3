use anyhow::anyhow;
use campus_filters::{
    Directories, FilterInput, FilterKind, Multiplicity, Navigation, SortKey, ViewSpec,
};
use tracing::debug;

use crate::cli::{MutateArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::reconcile::{save, save_target, settle};
use crate::output::render_navigation;

pub(crate) async fn handle_mutate(
    ctx: &AppContext,
    args: MutateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if !has_changes(&args) {
        return Err(CliError::validation(
            "nothing to change; pass --set, --clear, --sort, --page or --clear-all",
        ));
    }
    let save_to = save_target(&args.route)?;
    let mut settled = settle(ctx, &args.route).await?;
    let inputs = group_inputs(settled.session.view(), &args.set, &settled.directories)?;
    let sort = args.sort.as_deref().map(parse_sort);

    let session = &mut settled.session;
    let cache = &mut settled.cache;
    let mut navigation: Option<Navigation> = None;
    if args.clear_all {
        navigation = Some(session.clear_all(cache));
    }
    for key in &args.clear {
        navigation = Some(
            session
                .set_filter(cache, key, FilterInput::Clear)
                .ok_or_else(|| unknown_filter(&args.route.view, key))?,
        );
    }
    for (key, input) in inputs {
        navigation = Some(
            session
                .set_filter(cache, &key, input)
                .ok_or_else(|| unknown_filter(&args.route.view, &key))?,
        );
    }
    if let Some(sort) = &sort {
        navigation = Some(session.set_sort(cache, sort));
    }
    if let Some(page) = args.page {
        navigation = Some(session.set_page(cache, page));
    }
    let navigation = navigation
        .ok_or_else(|| CliError::failure(anyhow!("no interaction produced a navigation")))?;
    debug!(view = %args.route.view, href = %navigation.href(), "interactions applied");

    settled
        .route_to(ctx, &args.route, navigation.query.clone())
        .await?;
    render_navigation(
        &navigation.href(),
        settled.session.phase(),
        settled.report.request.as_ref(),
        format,
    )?;
    save(save_to, &settled.cache)
}

fn has_changes(args: &MutateArgs) -> bool {
    args.clear_all
        || !args.clear.is_empty()
        || !args.set.is_empty()
        || args.sort.is_some()
        || args.page.is_some()
}

fn unknown_filter(view: &str, key: &str) -> CliError {
    CliError::validation(format!("view '{view}' has no filter '{key}'"))
}

/// Group `--set` pairs per filter key, in first-seen order, into the input
/// shape each filter kind expects.
pub(crate) fn group_inputs(
    view: &ViewSpec,
    assignments: &[(String, String)],
    directories: &Directories,
) -> CliResult<Vec<(String, FilterInput)>> {
    let mut grouped: Vec<(String, Vec<&str>)> = Vec::new();
    for (key, value) in assignments {
        match grouped.iter_mut().find(|(seen, _)| seen == key) {
            Some((_, values)) => values.push(value.as_str()),
            None => grouped.push((key.clone(), vec![value.as_str()])),
        }
    }

    grouped
        .into_iter()
        .map(|(key, values)| {
            let descriptor = view
                .filter(&key)
                .ok_or_else(|| unknown_filter(view.list_key(), &key))?;
            if descriptor.multiplicity() == Multiplicity::Multi {
                let values = values.into_iter().map(str::to_string).collect();
                return Ok((key, FilterInput::Values(values)));
            }
            let [value] = values.as_slice() else {
                return Err(CliError::validation(format!(
                    "filter '{key}' takes a single value"
                )));
            };
            let input = match descriptor.kind() {
                FilterKind::DateRange { .. } => {
                    let (from, to) = value.split_once("..").ok_or_else(|| {
                        CliError::validation(format!(
                            "filter '{key}' expects a range as YYYY-MM-DD..YYYY-MM-DD"
                        ))
                    })?;
                    FilterInput::Range {
                        from: from.to_string(),
                        to: to.to_string(),
                    }
                }
                FilterKind::Reference { directory } => directories
                    .resolve(directory, value)
                    .map_or_else(|| FilterInput::from(*value), |entry| {
                        FilterInput::Entry(entry.clone())
                    }),
                _ => FilterInput::from(*value),
            };
            Ok((key, input))
        })
        .collect()
}

/// `-column` sorts descending; anything else ascending.
pub(crate) fn parse_sort(columns: &[String]) -> Vec<SortKey> {
    columns
        .iter()
        .map(|column| column.trim())
        .filter(|column| !column.is_empty())
        .map(|column| {
            column
                .strip_prefix('-')
                .map_or_else(|| SortKey::asc(column), SortKey::desc)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use campus_filters::{Catalog, DirectoryEntry};

    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn repeated_keys_feed_multi_value_filters() -> anyhow::Result<()> {
        let catalog = Catalog::standard()?;
        let view = catalog.get("subjects")?;
        let inputs = group_inputs(
            &view,
            &pairs(&[("classroom_ids", "9"), ("search", "math"), ("classroom_ids", "10")]),
            &Directories::new(),
        )
        .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(
            inputs,
            vec![
                (
                    "classroom_ids".to_string(),
                    FilterInput::Values(vec!["9".into(), "10".into()])
                ),
                ("search".to_string(), FilterInput::from("math")),
            ]
        );
        Ok(())
    }

    #[test]
    fn references_keep_known_labels() -> anyhow::Result<()> {
        let catalog = Catalog::standard()?;
        let view = catalog.get("users")?;
        let directories =
            Directories::new().with("schools", [DirectoryEntry::new("2", "South High")]);
        let inputs = group_inputs(&view, &pairs(&[("school_id", "2")]), &directories)
            .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(
            inputs,
            vec![(
                "school_id".to_string(),
                FilterInput::Entry(DirectoryEntry::new("2", "South High"))
            )]
        );

        let unresolved = group_inputs(&view, &pairs(&[("school_id", "8")]), &directories)
            .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(
            unresolved,
            vec![("school_id".to_string(), FilterInput::from("8"))]
        );
        Ok(())
    }

    #[test]
    fn date_ranges_split_on_dots() -> anyhow::Result<()> {
        let catalog = Catalog::standard()?;
        let view = catalog.get("payments")?;
        let inputs = group_inputs(
            &view,
            &pairs(&[("start_date", "2026-09-01..2026-09-30")]),
            &Directories::new(),
        )
        .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(
            inputs,
            vec![(
                "start_date".to_string(),
                FilterInput::Range {
                    from: "2026-09-01".into(),
                    to: "2026-09-30".into(),
                }
            )]
        );

        let error = group_inputs(&view, &pairs(&[("start_date", "2026-09-01")]), &Directories::new())
            .expect_err("needs both ends");
        assert_eq!(error.exit_code(), 2);
        Ok(())
    }

    #[test]
    fn undeclared_and_repeated_single_filters_are_rejected() -> anyhow::Result<()> {
        let catalog = Catalog::standard()?;
        let view = catalog.get("users")?;
        assert!(group_inputs(&view, &pairs(&[("colour", "red")]), &Directories::new()).is_err());
        assert!(
            group_inputs(
                &view,
                &pairs(&[("role", "admin"), ("role", "teacher")]),
                &Directories::new()
            )
            .is_err()
        );
        Ok(())
    }

    #[test]
    fn sort_prefixes_select_direction() {
        let keys = parse_sort(&["-created_at".into(), " email ".into(), String::new()]);
        assert_eq!(keys, vec![SortKey::desc("created_at"), SortKey::asc("email")]);
    }
}
