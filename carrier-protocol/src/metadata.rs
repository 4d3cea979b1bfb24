//! Multi-value metadata with HTTP-header key semantics.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered-irrelevant mapping from string key to one or more string values.
///
/// Keys are case-insensitive; they are normalized to lowercase on insert and
/// lookup. Values keep their insertion order per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: HashMap<String, Vec<String>>,
}

impl Metadata {
    /// Creates an empty metadata set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges any number of metadata sources left to right.
    ///
    /// The merge is additive: values from later sources are appended after
    /// values from earlier sources. No input is mutated.
    pub fn merge<'a>(sources: impl IntoIterator<Item = &'a Metadata>) -> Metadata {
        let mut merged = Metadata::new();
        for source in sources {
            for (key, values) in &source.entries {
                let slot = merged.entries.entry(key.clone()).or_default();
                slot.extend(values.iter().cloned());
            }
        }
        merged
    }

    /// Returns the first value for a key, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&normalize(key))
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns all values for a key.
    pub fn values(&self, key: &str) -> &[String] {
        self.entries
            .get(&normalize(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns whether the key has at least one value.
    pub fn has(&self, key: &str) -> bool {
        self.entries
            .get(&normalize(key))
            .is_some_and(|values| !values.is_empty())
    }

    /// Appends a value to a key.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(normalize(key))
            .or_default()
            .push(value.into());
    }

    /// Replaces all values for a key with a single value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(normalize(key), vec![value.into()]);
    }

    /// Removes a key and returns its values, if any.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(&normalize(key))
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over (key, values) pairs. Keys are in normalized form.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

fn normalize(key: &str) -> String {
    key.to_ascii_lowercase()
}
