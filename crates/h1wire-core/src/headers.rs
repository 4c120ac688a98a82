//! Header field storage
//!
//! Names are stored lower-cased. A name seen more than once keeps every
//! value, joined with `", "` in arrival order.

use std::collections::HashMap;

/// Separator used when a field name repeats
pub const VALUE_SEPARATOR: &str = ", ";

/// Mapping from lower-cased field name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: HashMap<String, String>,
}

impl Headers {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Check whether a header is present (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_ascii_lowercase())
    }

    /// Add a value, joining it onto any value already stored under `name`
    pub fn append(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        match self.fields.get_mut(&key) {
            Some(existing) => {
                existing.push_str(VALUE_SEPARATOR);
                existing.push_str(value);
            }
            None => {
                self.fields.insert(key, value.to_string());
            }
        }
    }

    /// Replace whatever is stored under `name`
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(&name.to_ascii_lowercase())
    }

    /// Iterate over `(name, value)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: AsRef<str>, V: AsRef<str>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value.as_ref());
        }
        headers
    }
}
