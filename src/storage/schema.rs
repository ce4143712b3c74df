//! Checkpoint schema definitions and migrations
//!
//! This module contains the on-disk layout of checkpoint files and the
//! single supported upgrade path from the legacy poster-only layout.

use crate::config::ConfigFingerprint;
use crate::crawler::dedupe_categories;
use crate::state::{DetailCache, DetailEntry, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Schema version of the legacy poster-only layout
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Durable snapshot of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointState {
    pub schema_version: u32,
    pub config_fingerprint: ConfigFingerprint,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_tasks: BTreeSet<String>,
    /// Task key -> captured error text
    #[serde(default)]
    pub failed_tasks: BTreeMap<String, String>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub detail_cache: DetailCache,
}

impl CheckpointState {
    /// Creates an empty checkpoint for a fresh run
    pub fn new(config_fingerprint: ConfigFingerprint) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            config_fingerprint,
            saved_at: None,
            completed_tasks: BTreeSet::new(),
            failed_tasks: BTreeMap::new(),
            records: Vec::new(),
            detail_cache: DetailCache::new(),
        }
    }
}

/// Configuration block of a legacy checkpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyConfigV1 {
    pub start_year: i32,
    pub end_year: i32,
    pub languages: Vec<String>,
}

/// Record layout of a legacy checkpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRecordV1 {
    pub year: i32,
    pub language: String,
    pub title: String,
    pub movie_page_url: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub description: String,
    pub source_url: String,
}

/// Detail entry layout of a legacy checkpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyDetailV1 {
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub description: String,
}

/// Legacy checkpoint: no failed-task map, and either a unified
/// `movie_details_cache` or only a `poster_cache` of URL -> poster
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyCheckpointV1 {
    pub version: u32,
    pub config: LegacyConfigV1,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
    #[serde(default)]
    pub records: Vec<LegacyRecordV1>,
    #[serde(default)]
    pub movie_details_cache: Option<BTreeMap<String, LegacyDetailV1>>,
    #[serde(default)]
    pub poster_cache: BTreeMap<String, String>,
}

/// Upgrades a legacy checkpoint to the current layout
///
/// When the legacy file has no unified detail cache, one is synthesized from
/// its poster cache with every description left empty.
pub fn migrate_v1_to_v2(legacy: LegacyCheckpointV1) -> CheckpointState {
    let config_fingerprint = ConfigFingerprint {
        start_year: legacy.config.start_year,
        end_year: legacy.config.end_year,
        categories: dedupe_categories(&legacy.config.languages),
    };

    let records = legacy
        .records
        .into_iter()
        .map(|r| Record {
            year: r.year,
            category: r.language,
            title: r.title,
            detail_url: r.movie_page_url,
            poster: r.poster_url,
            description: r.description,
            source_url: r.source_url,
        })
        .collect();

    let detail_cache = match legacy.movie_details_cache {
        Some(details) => details
            .into_iter()
            .map(|(url, d)| (url, DetailEntry::new(d.poster_url, d.description)))
            .collect(),
        None => legacy
            .poster_cache
            .into_iter()
            .map(|(url, poster)| (url, DetailEntry::new(poster, "")))
            .collect(),
    };

    CheckpointState {
        schema_version: CURRENT_SCHEMA_VERSION,
        config_fingerprint,
        saved_at: None,
        completed_tasks: legacy.completed_tasks.into_iter().collect(),
        failed_tasks: BTreeMap::new(),
        records,
        detail_cache,
    }
}
