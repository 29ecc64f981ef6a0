//! Router facade tests
//!
//! Every test starts a router over a fresh [`MemoryHistory`] with the same
//! route table.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    Completion, EventType, Href, History, Location, LocationDescriptor, MemoryHistory,
    NavigationType, Outcome, QueryInput, QueryPatch, RouteConfig, Router, RouterConfig,
    RouterErrorCode, UpdateQueryOptions, transform_event_type,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("").full(),
        RouteConfig::new("a").children([RouteConfig::new("a2").children([
            RouteConfig::new("a3").children([RouteConfig::new("a4")]),
        ])]),
        RouteConfig::new("b"),
        RouteConfig::new("c"),
    ]
}

async fn started() -> (Router, Arc<MemoryHistory>) {
    let history = Arc::new(MemoryHistory::default());
    let router = Router::new(history.clone(), routes()).unwrap();
    router.start().await.unwrap();
    (router, history)
}

fn search(router: &Router) -> String {
    router.location().search
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_commits_initial_location() {
    let history = Arc::new(MemoryHistory::at("/a/a2?x=1"));
    let router = Router::new(history, routes()).unwrap();
    assert!(!router.is_started());

    let completion = router.start().await.unwrap();

    assert_eq!(
        completion,
        Completion::Committed {
            sequence: 0,
            location: Location::parse("/a/a2?x=1")
        }
    );
    assert!(router.is_started());
    assert_eq!(router.location().query["x"], "1");
    let paths: Vec<String> = router.routes().iter().map(|m| m.node.path.clone()).collect();
    assert_eq!(paths, vec!["", "a", "a2"]);

    // Starting twice waits for the same initial navigation.
    assert_eq!(router.start().await.unwrap().sequence(), 0);
}

#[tokio::test]
async fn test_navigation_requires_start() {
    let router = Router::new(Arc::new(MemoryHistory::default()), routes()).unwrap();
    let error = router.push("/a").await.unwrap_err();
    assert_eq!(error.code, RouterErrorCode::NotStarted);
}

#[tokio::test]
async fn test_stop_ignores_history() {
    let (router, history) = started().await;
    router.stop();
    assert!(!router.is_started());

    history.push(Location::new("/b"));
    tokio::task::yield_now().await;
    assert_eq!(router.location().pathname, "/");
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let history = Arc::new(MemoryHistory::default());
    let error = Router::builder(history.clone())
        .config(RouterConfig::new().with_event_buffer(0))
        .build()
        .unwrap_err();
    assert_eq!(error.code, RouterErrorCode::InvalidConfig);

    let error = Router::builder(history)
        .config(RouterConfig::new().with_validate_routes(true))
        .route(RouteConfig::new(":id/:id"))
        .build()
        .unwrap_err();
    assert_eq!(error.code, RouterErrorCode::InvalidConfig);
}

// =============================================================================
// Navigation
// =============================================================================

#[tokio::test]
async fn test_handling_transition_events() {
    let (router, _history) = started().await;
    let scheduler = router.scheduler();

    let navigation = scheduler.next_navigation(NavigationType::Push, Some(Location::new("/a")));
    scheduler.dispatch(navigation).wait().await.unwrap();
    assert_eq!(router.location().pathname, "/a");

    let navigation = scheduler.next_navigation(NavigationType::GoBack, None);
    scheduler.dispatch(navigation).wait().await.unwrap();
    assert_eq!(router.location().pathname, "/");

    let navigation = scheduler.next_navigation(NavigationType::Replace, Some(Location::new("/b")));
    scheduler.dispatch(navigation).wait().await.unwrap();
    assert_eq!(router.location().pathname, "/b");
}

#[tokio::test]
async fn test_push_replace_and_back() {
    let (router, history) = started().await;

    router.push("/a").await.unwrap();
    router.push("/b").await.unwrap();
    router.replace("/c").await.unwrap();
    assert_eq!(router.location().pathname, "/c");
    assert_eq!(history.len(), 3);

    let completion = router.go_back().await.unwrap();
    assert!(completion.is_committed());
    assert_eq!(router.location().pathname, "/a");

    router.go_back().await.unwrap();
    assert_eq!(router.location().pathname, "/");

    let completion = router.go_back().await.unwrap();
    assert!(completion.is_committed());
    assert_eq!(router.location().pathname, "/");
    assert_eq!(history.index(), 0);
}

#[tokio::test]
async fn test_go_back_at_first_entry_resolves_to_root() {
    let history = Arc::new(MemoryHistory::at("/a/a2"));
    let router = Router::new(history.clone(), routes()).unwrap();
    router.start().await.unwrap();
    let mut events = router.events();

    let completion = router.go_back().await.unwrap();

    assert_eq!(
        completion,
        Completion::Committed {
            sequence: 1,
            location: Location::root()
        }
    );
    assert_eq!(router.location().pathname, "/");
    assert_eq!(history.len(), 1);
    let start = events.try_recv().unwrap();
    assert_eq!(start.navigation().navigation_type, NavigationType::GoBack);
}

#[tokio::test]
async fn test_relative_push() {
    let (router, _history) = started().await;
    router.push("/a/a2/a3/a4").await.unwrap();

    router.push("..").await.unwrap();
    assert_eq!(router.location().pathname, "/a/a2/a3");

    router.push("a4").await.unwrap();
    assert_eq!(router.location().pathname, "/a/a2/a3/a4");
}

#[tokio::test]
async fn test_not_found_keeps_location() {
    let (router, history) = started().await;
    router.push("/b").await.unwrap();

    let error = router.push("/nope").await.unwrap_err();
    assert!(error.is_not_found());
    assert_eq!(router.location().pathname, "/b");
    assert_eq!(history.location().pathname, "/nope");
}

#[tokio::test]
async fn test_rejected_navigation_leaves_committed_location_as_base() {
    let (router, history) = started().await;
    router.push("/a/a2").await.unwrap();

    router.push("/nope").await.unwrap_err();
    assert_eq!(history.location().pathname, "/nope");

    assert_eq!(router.resolve_path("a3", None), "/a/a2/a3");

    router.push("a3").await.unwrap();
    assert_eq!(router.location().pathname, "/a/a2/a3");

    router.push("/missing").await.unwrap_err();
    let completion = router
        .update_query(QueryPatch::new().set("x", "1"), UpdateQueryOptions::default())
        .await
        .unwrap();
    assert!(completion.is_committed());
    assert_eq!(router.location().href(), "/a/a2/a3?x=1");
}

#[tokio::test]
async fn test_prev_routes() {
    let (router, _history) = started().await;
    router.push("/a/a2").await.unwrap();
    router.push("/c").await.unwrap();

    let prev: Vec<String> = router.prev_routes().iter().map(|m| m.url()).collect();
    assert_eq!(prev, vec!["", "/a", "/a/a2"]);
}

// =============================================================================
// Queries and hrefs
// =============================================================================

#[tokio::test]
async fn test_stringify_query_into_search() {
    let (router, _history) = started().await;
    let query: BTreeMap<String, String> = [("c", "3"), ("b", "2")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    router
        .push(LocationDescriptor::new().pathname("/a").query(query))
        .await
        .unwrap();
    assert_eq!(search(&router), "?b=2&c=3");

    router
        .push(LocationDescriptor::new().pathname("/a").query(BTreeMap::new()))
        .await
        .unwrap();
    assert_eq!(search(&router), "");

    router.push(LocationDescriptor::new().pathname("/a")).await.unwrap();
    assert_eq!(search(&router), "");
}

#[tokio::test]
async fn test_string_query_passed_as_is() {
    let (router, _history) = started().await;
    let raw = "search%5Buser_name%5D=John";

    router
        .push(
            LocationDescriptor::new()
                .pathname("/a")
                .query(QueryInput::Raw(raw.to_string())),
        )
        .await
        .unwrap();
    assert_eq!(search(&router), format!("?{}", raw));
    assert_eq!(router.location().query["search[user_name]"], "John");

    router.push("").await.unwrap();
    assert_eq!(search(&router), "");
    assert_eq!(router.location().pathname, "/a");
}

#[tokio::test]
async fn test_update_query() {
    let (router, _history) = started().await;
    let replace = UpdateQueryOptions::default();
    let merge = UpdateQueryOptions::merge();

    router.update_query(QueryPatch::new().set("x", "1"), replace).await.unwrap();
    assert_eq!(search(&router), "?x=1");

    router.update_query(QueryPatch::new().set("y", "2"), merge).await.unwrap();
    assert_eq!(search(&router), "?x=1&y=2");

    router.update_query(QueryPatch::new().set("y", "3"), merge).await.unwrap();
    assert_eq!(search(&router), "?x=1&y=3");

    router
        .update_query(QueryPatch::new().set("y", "4").set("z", "5"), replace)
        .await
        .unwrap();
    assert_eq!(search(&router), "?y=4&z=5");

    router
        .update_query(QueryPatch::new().set("y", "4").unset("z"), merge)
        .await
        .unwrap();
    assert_eq!(search(&router), "?y=4");

    router.update_query(QueryPatch::new(), replace).await.unwrap();
    assert_eq!(search(&router), "");
}

#[tokio::test]
async fn test_create_href() {
    let (router, _history) = started().await;
    assert_eq!(router.create_href(Some(Href::from("/a/b/c"))), "/a/b/c");
    assert_eq!(router.create_href(Some(Href::from(""))), "/");
    assert_eq!(
        router.create_href(Some(Href::from(
            LocationDescriptor::new().pathname("/a/b/c").search("?hey=1")
        ))),
        "/a/b/c?hey=1"
    );
    assert_eq!(
        router.create_href(Some(Href::from(LocationDescriptor::new().pathname("/a/b/c").hash("#ok")))),
        "/a/b/c#ok"
    );
    assert_eq!(router.create_href(Some(Href::from(LocationDescriptor::new()))), "/");
    assert_eq!(router.create_href(None), "/");
}

#[tokio::test]
async fn test_resolve_path_defaults_to_current_pathname() {
    let (router, _history) = started().await;
    router.push("/a/a2/a3/a4/").await.unwrap();

    assert_eq!(router.resolve_path("a5", None), "/a/a2/a3/a4/a5");
    assert_eq!(router.resolve_path("../../b3", None), "/a/a2/b3");
    assert_eq!(router.resolve_path("../", Some("/a/a2/a3/a4")), "/a/a2/a3/");
}

// =============================================================================
// Redirects through the history
// =============================================================================

#[tokio::test]
async fn test_guard_redirect_replaces_history_entry() {
    let history = Arc::new(MemoryHistory::default());
    let mut routes = routes();
    routes.push(RouteConfig::new("old").can_activate(|navigation, _matched| async move {
        Ok(navigation.redirect_to("/c"))
    }));
    let router = Router::new(history.clone(), routes).unwrap();
    router.start().await.unwrap();

    let completion = router.push("/old").await.unwrap();

    assert!(completion.is_committed());
    assert_eq!(router.location().pathname, "/c");
    assert_eq!(history.location().pathname, "/c");
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_middleware_go_back_pops_history() {
    let history = Arc::new(MemoryHistory::default());
    let block_b = transform_event_type(EventType::NavigationActivating, |event, _store| async move {
        match event.navigation().pathname() {
            Some("/b") => Ok(event.navigation().go_back()),
            _ => Ok(Outcome::Proceed(event)),
        }
    });
    let router = Router::builder(history.clone())
        .routes(routes())
        .middleware(block_b)
        .build()
        .unwrap();
    router.start().await.unwrap();

    router.push("/a").await.unwrap();
    let completion = router.push("/b").await.unwrap();

    assert!(completion.is_committed());
    assert_eq!(router.location().pathname, "/a");
    assert_eq!(history.index(), 1);
}

#[tokio::test]
async fn test_events_subscription() {
    let (router, _history) = started().await;
    let mut events = router.events();

    router.push("/b").await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push((event.sequence(), event.event_type()));
    }
    assert_eq!(seen.first(), Some(&(1, EventType::NavigationStart)));
    assert_eq!(seen.last(), Some(&(1, EventType::NavigationEnd)));
}
