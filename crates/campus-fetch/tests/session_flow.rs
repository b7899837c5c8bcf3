use std::sync::Arc;
use std::time::Duration;

use campus_fetch::{FetchScheduler, SchedulePolicy};
use campus_filters::{ListSession, ParamCache, Query, RouteState, WireValue};
use campus_test_support::fixtures::{loaded_directories, search_view};
use campus_test_support::mocks::RecordingSource;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn typing_then_clearing_search_drives_the_scheduler() {
    let view = search_view(false);
    let source = Arc::new(RecordingSource::echo());
    let scheduler: FetchScheduler<String> = FetchScheduler::spawn(
        Arc::clone(&view),
        SchedulePolicy::default(),
        source.clone(),
        None,
    );
    let directories = loaded_directories();
    let mut cache = ParamCache::new();
    let mut session = ListSession::mount(Arc::clone(&view));

    let url = Query::parse("search=smith&page=3");
    session.on_route(RouteState::Ready(&url), &mut cache, &directories);
    scheduler.schedule(session.request().expect("stable after reconciling"));
    sleep(Duration::from_millis(500)).await;
    let first = source.requests();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].filter("search"), Some(&WireValue::Text("smith".into())));
    assert_eq!(first[0].offset, 30);

    for typed in ["a", "ab"] {
        session
            .set_filter(&mut cache, "search", typed)
            .expect("declared filter");
        scheduler.schedule(session.request().expect("still stable"));
        sleep(Duration::from_millis(100)).await;
    }
    sleep(Duration::from_millis(400)).await;
    let typed = source.requests();
    assert_eq!(typed.len(), 2, "one request for the settled text");
    assert_eq!(typed[1].filter("search"), Some(&WireValue::Text("ab".into())));
    assert_eq!(typed[1].offset, 0);

    let navigation = session
        .set_filter(&mut cache, "search", "")
        .expect("declared filter");
    session.on_route(RouteState::Ready(&navigation.query), &mut cache, &directories);
    scheduler.schedule(session.request().expect("stable after clearing"));
    sleep(Duration::from_millis(500)).await;

    let cleared = source.requests();
    assert_eq!(cleared.len(), 3);
    assert!(cleared[2].filter("search").is_none());
    assert_eq!(cleared[2].offset, 0);
    assert!(cache.raw("people", "search").is_none());
}
