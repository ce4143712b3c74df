use crate::config::types::Config;
use crate::crawler::dedupe_categories;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The part of the configuration that determines task identity and dedupe
/// semantics
///
/// A checkpoint may only be resumed by a run whose fingerprint is equal to
/// the one stored in it. Politeness delays, worker counts and output paths
/// are deliberately absent: changing them between runs is safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFingerprint {
    pub start_year: i32,
    pub end_year: i32,
    /// Configured categories after first-occurrence deduplication, in input
    /// order (priority reordering does not change task identity)
    pub categories: Vec<String>,
}

impl ConfigFingerprint {
    /// Builds the fingerprint for a configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            start_year: config.crawl.start_year,
            end_year: config.crawl.end_year,
            categories: dedupe_categories(&config.crawl.categories),
        }
    }

    /// Computes a SHA-256 digest of the fingerprint
    ///
    /// # Returns
    ///
    /// Hex-encoded SHA-256 hash of the canonical JSON form
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "years {}-{}, categories [{}]",
            self.start_year,
            self.end_year,
            self.categories.join(", ")
        )
    }
}
