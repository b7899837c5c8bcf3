use std::collections::BTreeSet;
use std::sync::Arc;

use campus_fetch::{DirectoryLoader, FetchError};
use campus_filters::{
    Directories, DirectoryEntry, DirectoryId, ListSession, ParamCache, Phase, Query,
    ReconcileStep, RouteState,
};
use campus_test_support::fixtures::search_view;
use campus_test_support::mocks::StaticDirectorySource;

fn schools(count: usize) -> Vec<DirectoryEntry> {
    (1..=count)
        .map(|id| DirectoryEntry::new(id.to_string(), format!("School {id}")))
        .collect()
}

fn required(ids: &[&str]) -> BTreeSet<DirectoryId> {
    ids.iter().map(|id| DirectoryId::new(*id)).collect()
}

#[tokio::test]
async fn fetch_all_follows_pages_until_a_short_one() {
    let source = Arc::new(StaticDirectorySource::new().with("schools", schools(5)));
    let loader = DirectoryLoader::new(source.clone())
        .with_page_size(2)
        .with_scope("district", "7");

    let entries = loader
        .fetch_all(&DirectoryId::new("schools"))
        .await
        .expect("directory loads");
    assert_eq!(entries, schools(5));

    let queries = source.queries();
    let offsets: Vec<u64> = queries.iter().map(|(_, query)| query.offset).collect();
    assert_eq!(offsets, vec![0, 2, 4]);
    assert!(
        queries
            .iter()
            .all(|(_, query)| query.scoping.get("district").map(String::as_str) == Some("7"))
    );
}

#[tokio::test]
async fn an_exact_multiple_ends_on_an_empty_page() {
    let source = Arc::new(StaticDirectorySource::new().with("schools", schools(4)));
    let loader = DirectoryLoader::new(source.clone()).with_page_size(2);

    let entries = loader
        .fetch_all(&DirectoryId::new("schools"))
        .await
        .expect("directory loads");
    assert_eq!(entries.len(), 4);
    assert_eq!(source.queries().len(), 3);
}

#[tokio::test]
async fn load_missing_keeps_failed_directories_pending() {
    let source = Arc::new(StaticDirectorySource::new().with("schools", schools(2)));
    let loader = DirectoryLoader::new(source);
    let mut directories = Directories::new();
    let wanted = required(&["schools", "rooms"]);

    let result = loader.load_missing(&mut directories, &wanted).await;
    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    assert!(directories.is_loaded(&DirectoryId::new("schools")));
    assert_eq!(directories.missing(&wanted), required(&["rooms"]));

    let again = loader
        .load_missing(&mut directories, &required(&["schools"]))
        .await;
    assert_eq!(again, Ok(0), "loaded directories are not fetched twice");
}

#[tokio::test]
async fn deferred_reconciliation_resumes_once_directories_load() {
    let source = Arc::new(
        StaticDirectorySource::new().with("schools", [DirectoryEntry::new("2", "South High")]),
    );
    let loader = DirectoryLoader::new(source);
    let mut directories = Directories::new();
    let mut cache = ParamCache::new();
    let mut session = ListSession::mount(search_view(false));
    let url = Query::parse("school_id=2");

    let step = session.on_route(RouteState::Ready(&url), &mut cache, &directories);
    let ReconcileStep::Deferred { phase, missing } = step else {
        panic!("reconciliation should wait for schools");
    };
    assert_eq!(phase, Phase::WaitingForPrerequisites);
    assert_eq!(missing, required(&["schools"]));

    let loaded = loader
        .load_missing(&mut directories, &missing)
        .await
        .expect("schools load");
    assert_eq!(loaded, 1);

    let step = session.on_route(RouteState::Ready(&url), &mut cache, &directories);
    assert!(matches!(step, ReconcileStep::Reconciled(_)));
    assert_eq!(session.phase(), Phase::Stable);
    let request = session.request().expect("stable request");
    assert!(request.filter("school_id").is_some());
}

#[tokio::test]
async fn a_directory_past_the_page_limit_is_never_marked_loaded() {
    let source = Arc::new(StaticDirectorySource::new().with("schools", schools(5)));
    let loader = DirectoryLoader::new(source.clone())
        .with_page_size(1)
        .with_page_limit(3);
    let mut directories = Directories::new();
    let wanted = required(&["schools"]);

    let result = loader.load_missing(&mut directories, &wanted).await;
    assert_eq!(
        result,
        Err(FetchError::Truncated {
            directory: "schools".into(),
            pages: 3,
        })
    );
    assert_eq!(source.queries().len(), 3);
    assert!(!directories.all_loaded(&wanted));
    assert_eq!(directories.missing(&wanted), wanted);
    assert!(directories.resolve(&DirectoryId::new("schools"), "1").is_none());
}
