//! Navigation model tests

use std::sync::Arc;

use crate::tree::{MatcherCache, RouteConfig, RouteNode};
use crate::{Href, Location, LocationDescriptor, MatchResult, Navigation, NavigationDescriptor, NavigationType, Outcome};

fn push(to: &str, sequence: u64) -> Navigation {
    NavigationDescriptor::new(NavigationType::Push, Some(Location::parse(to)))
        .sequence(sequence)
        .into()
}

fn leaf(parent_url: &str) -> MatchResult {
    let node = RouteNode::from_config(RouteConfig::new("b"), &MatcherCache::default()).unwrap();
    MatchResult {
        node: Arc::clone(&node),
        params: Default::default(),
        segment: "/b".to_string(),
        remaining: None,
        parent_url: parent_url.to_string(),
    }
}

fn redirect_target(outcome: Outcome) -> Navigation {
    match outcome {
        Outcome::Redirect(navigation) => navigation,
        other => panic!("expected redirect, got {:?}", other),
    }
}

#[test]
fn test_should_transition_defaults() {
    assert!(!push("/a", 0).should_transition);
    assert!(push("/a", 1).should_transition);

    let forced: Navigation = NavigationDescriptor::new(NavigationType::Pop, None)
        .sequence(5)
        .should_transition(false)
        .into();
    assert!(!forced.should_transition);

    let empty = Navigation::empty();
    assert_eq!(empty.navigation_type, NavigationType::Pop);
    assert!(empty.to.is_none());
}

#[test]
fn test_next_and_prev() {
    let current = push("/a", 3);

    let next = current.next(NavigationDescriptor::new(
        NavigationType::Replace,
        Some(Location::new("/b")),
    ));
    assert_eq!(next.sequence, 4);
    assert_eq!(next.navigation_type, NavigationType::Replace);
    assert_eq!(next.from, Some(Location::new("/a")));
    assert_eq!(next.pathname(), Some("/b"));
    assert!(next.should_transition);

    let prev = current.prev();
    assert_eq!(prev.sequence, 4);
    assert_eq!(prev.navigation_type, NavigationType::GoBack);
    assert!(prev.to.is_none());
    assert_eq!(prev.from, Some(Location::new("/a")));

    assert!(matches!(current.go_back::<()>(), Outcome::Redirect(n) if n.navigation_type == NavigationType::GoBack));
}

#[test]
fn test_redirect_to_absolute_and_relative() {
    let current = push("/a/b", 1).with_leaf(Some(leaf("/a")));

    let absolute = redirect_target(current.redirect_to("/login?next=1"));
    assert_eq!(absolute.navigation_type, NavigationType::Replace);
    assert_eq!(absolute.sequence, 2);
    assert_eq!(absolute.to.as_ref().map(Location::href).as_deref(), Some("/login?next=1"));

    let relative = redirect_target(current.redirect_to("c"));
    assert_eq!(relative.pathname(), Some("/a/c"));

    let no_leaf = redirect_target(push("/x", 1).redirect_to("y"));
    assert_eq!(no_leaf.pathname(), Some("/y"));
}

#[test]
fn test_redirect_to_descriptor_keeps_pathname() {
    let current = push("/list", 7);
    let target = redirect_target(current.redirect_to(Href::from(
        LocationDescriptor::new().search("?page=2"),
    )));
    assert_eq!(target.to.as_ref().map(Location::href).as_deref(), Some("/list?page=2"));
}

#[test]
fn test_outcome_map() {
    let outcome: Outcome<u32> = Outcome::Proceed(2);
    assert!(matches!(outcome.map(|v| v * 2), Outcome::Proceed(4)));

    let cancelled: Outcome<u32> = Outcome::Cancel("nope".to_string());
    assert!(!cancelled.is_proceed());
    assert!(matches!(cancelled.map(|v| v + 1), Outcome::Cancel(reason) if reason == "nope"));
}
