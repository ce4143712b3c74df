use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Enrichment data scraped from a detail page
///
/// An entry with both fields empty is still meaningful: it records that the
/// page was fetched (or failed to fetch) and must not be fetched again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEntry {
    #[serde(default)]
    pub poster: String,
    #[serde(default)]
    pub description: String,
}

impl DetailEntry {
    pub fn new(poster: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            poster: poster.into(),
            description: description.into(),
        }
    }

    /// Returns true if neither field carries data
    pub fn is_empty(&self) -> bool {
        self.poster.is_empty() && self.description.is_empty()
    }
}

/// Detail URL -> DetailEntry, write-once
///
/// Only the orchestrating task mutates the cache; detail workers hand their
/// results back instead of writing here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetailCache {
    entries: BTreeMap<String, DetailEntry>,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an entry unless the URL is already cached
    ///
    /// # Returns
    ///
    /// * `true` - The entry was stored
    /// * `false` - The URL already had an entry, which is left untouched
    pub fn insert(&mut self, url: impl Into<String>, entry: DetailEntry) -> bool {
        use std::collections::btree_map::Entry;

        match self.entries.entry(url.into()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Replaces the entry for a URL unconditionally
    ///
    /// Reserved for manual record imports, which take precedence over
    /// anything fetched.
    pub fn seed(&mut self, url: impl Into<String>, entry: DetailEntry) {
        self.entries.insert(url.into(), entry);
    }

    pub fn get(&self, url: &str) -> Option<&DetailEntry> {
        self.entries.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cached URLs whose fetch produced no data
    pub fn empty_entries(&self) -> usize {
        self.entries.values().filter(|e| e.is_empty()).count()
    }
}

impl FromIterator<(String, DetailEntry)> for DetailCache {
    fn from_iter<I: IntoIterator<Item = (String, DetailEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
