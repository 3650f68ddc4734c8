//! The per-request parameter store.

use std::collections::HashMap;

/// String key/value map rebuilt for every request.
///
/// Holds the merged request input (query string, form body, JSON body)
/// plus any path-template bindings made during route matching. Lookups
/// on absent keys yield `None`; writes overwrite.
#[derive(Debug, Default, Clone)]
pub struct ParamStore {
    data: HashMap<String, String>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a value up; absent keys yield `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Sets a value, overwriting any prior one under the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
