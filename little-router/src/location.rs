//! Location value types and the query string codec
//!
//! A [`Location`] describes "where we are": pathname, search string, hash and
//! the parsed query mapping. Equality is structural on pathname, search and
//! hash only; the parsed query and the opaque state never take part.
//!
//! Query strings use standard form encoding with keys serialized in sorted
//! order, so `{ c: "3", b: "2" }` always becomes `?b=2&c=3`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Flat, string-keyed query mapping.
pub type Query = BTreeMap<String, String>;

/// An immutable location value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Path portion, always starting with `/`
    pub pathname: String,
    /// Search string including the leading `?`, or empty
    #[serde(default)]
    pub search: String,
    /// Hash including the leading `#`, or empty
    #[serde(default)]
    pub hash: String,
    /// Parsed form of `search`
    #[serde(default)]
    pub query: Query,
    /// Arbitrary state attached by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.pathname == other.pathname && self.search == other.search && self.hash == other.hash
    }
}

impl Eq for Location {}

impl Default for Location {
    fn default() -> Self {
        Self::root()
    }
}

impl Location {
    /// Create a location for a pathname with no search or hash.
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: normalize_pathname(pathname.into()),
            search: String::new(),
            hash: String::new(),
            query: Query::new(),
            state: None,
        }
    }

    /// The `/` location.
    pub fn root() -> Self {
        Self::new("/")
    }

    /// Parse an href of the form `pathname?search#hash`.
    pub fn parse(href: &str) -> Self {
        let (rest, hash) = match href.find('#') {
            Some(idx) => (&href[..idx], &href[idx..]),
            None => (href, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        Self::new(pathname).with_search(search).with_hash(hash)
    }

    /// Replace the search string; the query mapping is re-parsed from it.
    pub fn with_search(mut self, search: impl AsRef<str>) -> Self {
        self.search = normalize_prefixed(search.as_ref(), '?');
        self.query = parse_query(&self.search);
        self
    }

    /// Replace the query mapping; the search string is re-serialized from it.
    pub fn with_query(mut self, query: Query) -> Self {
        self.search = search_from_query(&query);
        self.query = query;
        self
    }

    /// Replace the hash.
    pub fn with_hash(mut self, hash: impl AsRef<str>) -> Self {
        self.hash = normalize_prefixed(hash.as_ref(), '#');
        self
    }

    /// Attach opaque state.
    pub fn with_state(mut self, state: serde_json::Value) -> Self {
        self.state = Some(state);
        self
    }

    /// Concatenate pathname, search and hash.
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.href())
    }
}

fn normalize_pathname(pathname: String) -> String {
    if pathname.is_empty() {
        "/".to_string()
    } else if pathname.starts_with('/') {
        pathname
    } else {
        format!("/{}", pathname)
    }
}

fn normalize_prefixed(value: &str, prefix: char) -> String {
    let body = value.strip_prefix(prefix).unwrap_or(value);
    if body.is_empty() {
        String::new()
    } else {
        format!("{}{}", prefix, body)
    }
}

/// Parse a search string (with or without the leading `?`) into a query mapping.
///
/// Repeated keys keep the last value.
pub fn parse_query(search: &str) -> Query {
    let body = search.strip_prefix('?').unwrap_or(search);
    form_urlencoded::parse(body.as_bytes()).into_owned().collect()
}

/// Serialize a query mapping without the leading `?`.
pub fn stringify_query(query: &Query) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter())
        .finish()
}

fn search_from_query(query: &Query) -> String {
    let encoded = stringify_query(query);
    if encoded.is_empty() {
        String::new()
    } else {
        format!("?{}", encoded)
    }
}

/// Query given as either a mapping or a pre-encoded string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    /// Serialized with sorted keys
    Map(Query),
    /// Passed through as-is
    Raw(String),
}

impl From<Query> for QueryInput {
    fn from(query: Query) -> Self {
        Self::Map(query)
    }
}

impl From<&str> for QueryInput {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

/// A partial location, where absent fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationDescriptor {
    /// Path portion
    pub pathname: Option<String>,
    /// Search string; ignored when a non-empty `query` is given
    pub search: Option<String>,
    /// Hash
    pub hash: Option<String>,
    /// Query mapping or raw query string
    pub query: Option<QueryInput>,
    /// Opaque state
    pub state: Option<serde_json::Value>,
}

impl LocationDescriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pathname.
    pub fn pathname(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = Some(pathname.into());
        self
    }

    /// Set the search string.
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set the hash.
    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Set the query.
    pub fn query(mut self, query: impl Into<QueryInput>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the opaque state.
    pub fn state(mut self, state: serde_json::Value) -> Self {
        self.state = Some(state);
        self
    }

    /// Build a location, using `fallback_pathname` when no pathname was given.
    pub fn into_location(self, fallback_pathname: &str) -> Location {
        let pathname = self
            .pathname
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| fallback_pathname.to_string());

        let search = match self.query {
            Some(QueryInput::Map(query)) if !query.is_empty() => search_from_query(&query),
            Some(QueryInput::Raw(raw)) if !raw.is_empty() => normalize_prefixed(&raw, '?'),
            Some(_) => String::new(),
            None => self.search.unwrap_or_default(),
        };

        let mut location = Location::new(pathname)
            .with_search(search)
            .with_hash(self.hash.unwrap_or_default());
        location.state = self.state;
        location
    }
}

/// Anything that can name a navigation target.
#[derive(Debug, Clone, PartialEq)]
pub enum Href {
    /// An href string, possibly relative
    Path(String),
    /// A complete location
    Location(Location),
    /// A partial location
    Descriptor(LocationDescriptor),
}

impl From<&str> for Href {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for Href {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Location> for Href {
    fn from(location: Location) -> Self {
        Self::Location(location)
    }
}

impl From<LocationDescriptor> for Href {
    fn from(descriptor: LocationDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// Pending changes to a query mapping; `None` values remove the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPatch(BTreeMap<String, Option<String>>);

impl QueryPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key to a value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    /// Mark a key as undefined; it is dropped from the resulting query.
    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    /// Build a patch from a JSON object, coercing non-string values to strings.
    ///
    /// `null` values mark the key as undefined.
    pub fn from_json(value: &serde_json::Value) -> crate::RouterResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            crate::RouterError::invalid_config("Query patch must be a JSON object")
        })?;
        Ok(Self(
            object
                .iter()
                .map(|(key, value)| (key.clone(), coerce_query_value(value)))
                .collect(),
        ))
    }

    /// Apply the patch to `current`.
    ///
    /// With `merge`, keys from `current` are kept unless overridden; without
    /// it the patch replaces the query entirely. Undefined keys are removed
    /// in both modes.
    pub fn apply(&self, current: &Query, merge: bool) -> Query {
        let mut next = if merge { current.clone() } else { Query::new() };
        for (key, value) in &self.0 {
            match value {
                Some(value) => {
                    next.insert(key.clone(), value.clone());
                }
                None => {
                    next.remove(key);
                }
            }
        }
        next
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for QueryPatch {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        )
    }
}

fn coerce_query_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
