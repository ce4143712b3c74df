use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One catalog entry discovered on a listing page and enriched from its
/// detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub year: i32,
    pub category: String,
    pub title: String,
    pub detail_url: String,
    #[serde(default)]
    pub poster: String,
    #[serde(default)]
    pub description: String,
    /// The listing page this record was found on
    pub source_url: String,
}

/// Case-folds a title for deduplication
pub fn fold_title(title: &str) -> String {
    title.to_lowercase()
}

/// Key under which two records count as the same catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupeKey {
    pub year: i32,
    pub folded_title: String,
}

impl DedupeKey {
    pub fn new(year: i32, title: &str) -> Self {
        Self {
            year,
            folded_title: fold_title(title),
        }
    }
}

impl Record {
    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey::new(self.year, &self.title)
    }

    /// Output ordering: year, category, case-folded title
    ///
    /// Raw title and detail URL break the remaining ties so the order never
    /// depends on how records were collected.
    pub fn output_order(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then_with(|| self.category.cmp(&other.category))
            .then_with(|| fold_title(&self.title).cmp(&fold_title(&other.title)))
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.detail_url.cmp(&other.detail_url))
    }
}

/// Sorts records into their deterministic output order
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| a.output_order(b));
}
