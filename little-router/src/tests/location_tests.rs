//! Location and query codec tests

use serde_json::json;

use crate::{Location, LocationDescriptor, Query, QueryInput, QueryPatch, parse_query, stringify_query};

fn query(pairs: &[(&str, &str)]) -> Query {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_parse_href() {
    let location = Location::parse("/a/b?x=1&y=two#frag");
    assert_eq!(location.pathname, "/a/b");
    assert_eq!(location.search, "?x=1&y=two");
    assert_eq!(location.hash, "#frag");
    assert_eq!(location.query, query(&[("x", "1"), ("y", "two")]));
    assert_eq!(location.href(), "/a/b?x=1&y=two#frag");
}

#[test]
fn test_empty_pathname_is_root() {
    assert_eq!(Location::parse("").pathname, "/");
    assert_eq!(Location::new("a").pathname, "/a");
    assert_eq!(Location::default(), Location::root());
}

#[test]
fn test_equality_ignores_state() {
    let a = Location::new("/a").with_state(json!({ "scroll": 10 }));
    let b = Location::new("/a");
    assert_eq!(a, b);
    assert_ne!(Location::new("/a"), Location::new("/a").with_hash("top"));
}

#[test]
fn test_query_keys_sorted_and_encoded() {
    let q = query(&[("c", "3"), ("b", "2"), ("q", "a b&c")]);
    assert_eq!(stringify_query(&q), "b=2&c=3&q=a+b%26c");
    assert_eq!(parse_query("?q=a+b%26c&b=2"), query(&[("b", "2"), ("q", "a b&c")]));
    assert!(parse_query("").is_empty());
}

#[test]
fn test_with_query_rewrites_search() {
    let location = Location::parse("/a?old=1").with_query(query(&[("x", "1")]));
    assert_eq!(location.search, "?x=1");

    let cleared = location.with_query(Query::new());
    assert_eq!(cleared.search, "");
    assert_eq!(cleared.href(), "/a");
}

#[test]
fn test_descriptor_query_map_and_raw() {
    let location = LocationDescriptor::new()
        .pathname("/list")
        .query(query(&[("page", "2"), ("sort", "asc")]))
        .into_location("/");
    assert_eq!(location.href(), "/list?page=2&sort=asc");

    let raw = LocationDescriptor::new()
        .query(QueryInput::Raw("z=1&a=2".to_string()))
        .into_location("/current");
    assert_eq!(raw.href(), "/current?z=1&a=2");
    assert_eq!(raw.query, query(&[("a", "2"), ("z", "1")]));

    let search = LocationDescriptor::new().search("?s=1").hash("h").into_location("/");
    assert_eq!(search.href(), "/?s=1#h");
}

#[test]
fn test_query_patch_sequence() {
    let mut current = Query::new();
    let steps: Vec<(QueryPatch, bool, &str)> = vec![
        (QueryPatch::new().set("x", "1"), false, "?x=1"),
        (QueryPatch::new().set("y", "2"), true, "?x=1&y=2"),
        (QueryPatch::new().set("y", "3"), true, "?x=1&y=3"),
        (QueryPatch::new().set("y", "4").set("z", "5"), false, "?y=4&z=5"),
        (QueryPatch::new().set("y", "4").unset("z"), true, "?y=4"),
        (QueryPatch::new(), false, ""),
    ];

    for (patch, merge, expected) in steps {
        current = patch.apply(&current, merge);
        assert_eq!(Location::root().with_query(current.clone()).search, expected);
    }
}

#[test]
fn test_query_patch_from_json_coerces() {
    let patch = QueryPatch::from_json(&json!({ "n": 5, "b": true, "s": "x", "gone": null })).unwrap();
    let next = patch.apply(&query(&[("gone", "1"), ("keep", "k")]), true);
    assert_eq!(
        next,
        query(&[("b", "true"), ("keep", "k"), ("n", "5"), ("s", "x")])
    );

    assert!(QueryPatch::from_json(&json!([1, 2])).is_err());
}
