//! Href helper tests
//!
//! Relative path resolution against a working directory, and href
//! construction from the different target shapes.

use proptest::prelude::*;

use crate::{Href, Location, LocationDescriptor, create_href, resolve_path};

const CWD: &str = "/a/a2/a3/a4/";

#[test]
fn test_resolve_absolute() {
    assert_eq!(resolve_path("/a", CWD), "/a");
    assert_eq!(resolve_path("/a/", CWD), "/a/");
    assert_eq!(resolve_path("/a/../b", CWD), "/b");
    assert_eq!(resolve_path("/a/./b", CWD), "/a/b");
}

#[test]
fn test_resolve_relative() {
    assert_eq!(resolve_path("a5", CWD), "/a/a2/a3/a4/a5");
    assert_eq!(resolve_path("..", CWD), "/a/a2/a3");
    assert_eq!(resolve_path("../", CWD), "/a/a2/a3/");
    assert_eq!(resolve_path("../b4", CWD), "/a/a2/a3/b4");
    assert_eq!(resolve_path("../../b3", CWD), "/a/a2/b3");
    assert_eq!(resolve_path("../../../b2", CWD), "/a/b2");
    assert_eq!(resolve_path("../../../../b", CWD), "/b");
    assert_eq!(resolve_path("./", CWD), "/a/a2/a3/a4/");
    assert_eq!(resolve_path("./b5", CWD), "/a/a2/a3/a4/b5");
    assert_eq!(resolve_path("./b5/b6", CWD), "/a/a2/a3/a4/b5/b6");
    assert_eq!(resolve_path("./b5/../c5", CWD), "/a/a2/a3/a4/c5");
}

#[test]
fn test_resolve_clamps_at_root() {
    assert_eq!(resolve_path("../../../../../../../../../b", CWD), "/b");
    assert_eq!(resolve_path("../../../../../..", CWD), "/");
    assert_eq!(resolve_path("../../../../../../", CWD), "/");
}

#[test]
fn test_resolve_cwd_trailing_slash_is_irrelevant() {
    for cwd in ["/a/a2/a3/a4", "/a/a2/a3/a4/"] {
        assert_eq!(resolve_path("../", cwd), "/a/a2/a3/");
        assert_eq!(resolve_path("..", cwd), "/a/a2/a3");
    }
    assert_eq!(resolve_path("../../", CWD), "/a/a2/");
    assert_eq!(resolve_path("../b4", CWD), "/a/a2/a3/b4");
    assert_eq!(resolve_path("./b5", CWD), "/a/a2/a3/a4/b5");
}

#[test]
fn test_create_href() {
    assert_eq!(create_href(Some(&Href::from("/a/b/c"))), "/a/b/c");
    assert_eq!(create_href(Some(&Href::from(""))), "/");
    assert_eq!(create_href(None), "/");

    let descriptor = |d: LocationDescriptor| create_href(Some(&Href::from(d)));
    assert_eq!(descriptor(LocationDescriptor::new().pathname("/a/b/c")), "/a/b/c");
    assert_eq!(
        descriptor(LocationDescriptor::new().pathname("/a/b/c").search("?hey=1")),
        "/a/b/c?hey=1"
    );
    assert_eq!(
        descriptor(LocationDescriptor::new().pathname("/a/b/c").hash("#ok")),
        "/a/b/c#ok"
    );
    assert_eq!(descriptor(LocationDescriptor::new()), "/");

    assert_eq!(
        create_href(Some(&Href::from(Location::parse("/x?y=1#z")))),
        "/x?y=1#z"
    );
}

fn segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("..".to_string()),
        Just(".".to_string()),
        "[a-z]{1,4}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The result is absolute, normalized, and never escapes the root.
    #[test]
    fn prop_resolve_never_escapes_root(
        cwd in prop::collection::vec("[a-z]{1,4}", 0..6),
        path in prop::collection::vec(segment_strategy(), 0..10),
        absolute in any::<bool>(),
        trailing in any::<bool>(),
    ) {
        let cwd = format!("/{}", cwd.join("/"));
        let mut path = path.join("/");
        if absolute {
            path.insert(0, '/');
        }
        if trailing {
            path.push('/');
        }

        let resolved = resolve_path(&path, &cwd);

        prop_assert!(resolved.starts_with('/'));
        for segment in resolved.trim_end_matches('/').split('/').skip(1) {
            prop_assert!(!segment.is_empty(), "empty segment in {}", resolved);
            prop_assert!(segment != ".." && segment != ".", "unresolved segment in {}", resolved);
        }
        if absolute {
            prop_assert_eq!(resolve_path(&path, "/elsewhere"), resolved);
        }
    }
}
