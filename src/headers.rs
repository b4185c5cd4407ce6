//! Case-insensitive header map.
//!
//! Lookups and replacement are keyed by the lower-cased header name while
//! the original casing is preserved for the wire. Multiple values for one
//! name collapse into a single comma-joined value with no space, matching
//! the behavior of transports that fold repeated headers. That join is
//! applied uniformly, including to `Set-Cookie`, where RFC 7230 forbids
//! folding; cookie-aware consumers have to split on `,` knowing the risk.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    name: String,
    value: String,
}

/// A case-insensitive mapping from header name to a comma-joined value.
///
/// # Examples
///
/// ```
/// use restbind::Headers;
///
/// let mut headers = Headers::new();
/// headers.set("Content-Type", "application/json");
/// headers.add("Via", "a");
/// headers.add("VIA", "b");
///
/// assert_eq!(headers.value("content-type"), Some("application/json"));
/// assert_eq!(headers.value("via"), Some("a,b"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    map: BTreeMap<String, Header>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any existing value for the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        self.map.insert(
            key,
            Header {
                name,
                value: value.into(),
            },
        );
    }

    /// Adds a header value, comma-joining with any existing value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        let value = value.into();
        match self.map.get_mut(&key) {
            Some(existing) => {
                existing.value.push(',');
                existing.value.push_str(&value);
            }
            None => {
                self.map.insert(key, Header { name, value });
            }
        }
    }

    /// Returns the joined value for a name, if present.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.map
            .get(&name.to_ascii_lowercase())
            .map(|h| h.value.as_str())
    }

    /// Returns `true` if a header with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes a header, returning its joined value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.map.remove(&name.to_ascii_lowercase()).map(|h| h.value)
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map holds no headers.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over `(original-case name, joined value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map
            .values()
            .map(|h| (h.name.as_str(), h.value.as_str()))
    }

    /// Snapshot as a map keyed by the original-case names.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.map
            .values()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect()
    }
}

/// Serializes as a dictionary of lower-cased name to joined value, the
/// form consumed when deserializing a typed headers struct.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.map.len()))?;
        for (key, header) in &self.map {
            map.serialize_entry(key, &header.value)?;
        }
        map.end()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}
