//! Pure href helpers: relative path resolution and href construction.

use crate::location::{Href, Location};

/// Resolve `path` against the directory `cwd`.
///
/// `cwd` is always treated as a directory, with or without a trailing slash.
/// `.` segments are dropped, `..` pops one segment and never ascends past
/// the root. The result keeps a trailing slash when `path` has one.
///
/// ```rust,ignore
/// assert_eq!(resolve_path("../../b", "/a/a2/a3/a4/"), "/a/a2/b");
/// assert_eq!(resolve_path("../../../../../b", "/a/a2/a3/a4"), "/b");
/// ```
pub fn resolve_path(path: &str, cwd: &str) -> String {
    let mut stack: Vec<&str> = if path.starts_with('/') {
        Vec::new()
    } else {
        cwd.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }

    let mut resolved = format!("/{}", stack.join("/"));
    if path.ends_with('/') && !stack.is_empty() {
        resolved.push('/');
    }
    resolved
}

/// Build an href string; empty or absent input yields `/`.
pub fn create_href(to: Option<&Href>) -> String {
    match to {
        None => "/".to_string(),
        Some(Href::Path(path)) if path.is_empty() => "/".to_string(),
        Some(Href::Path(path)) => path.clone(),
        Some(Href::Location(location)) => location.href(),
        Some(Href::Descriptor(descriptor)) => descriptor.clone().into_location("/").href(),
    }
}

/// Turn an [`Href`] into a location, resolving relative string paths
/// against `current`.
pub(crate) fn to_location(href: Href, current: &Location) -> Location {
    match href {
        Href::Path(path) => {
            let location = Location::parse(&path);
            if path.starts_with('/') {
                return location;
            }
            let relative = path.split(['?', '#']).next().unwrap_or_default();
            let pathname = if relative.is_empty() {
                current.pathname.clone()
            } else {
                resolve_path(relative, &current.pathname)
            };
            Location {
                pathname,
                ..location
            }
        }
        Href::Location(location) => location,
        Href::Descriptor(descriptor) => descriptor.into_location(&current.pathname),
    }
}
