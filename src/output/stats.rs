//! Statistics generation from a checkpoint
//!
//! This module summarizes a saved checkpoint for the `--stats` command
//! without touching the network.

use crate::storage::CheckpointState;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Checkpoint statistics summary
#[derive(Debug, Clone)]
pub struct CheckpointStatistics {
    /// Schema version of the checkpoint after loading
    pub schema_version: u32,

    /// Human-readable configuration fingerprint
    pub fingerprint: String,

    /// SHA-256 digest of the fingerprint
    pub fingerprint_digest: String,

    /// When the checkpoint was last written, if recorded
    pub saved_at: Option<DateTime<Utc>>,

    /// Number of tasks in the configured range
    pub total_tasks: usize,

    /// Number of completed tasks
    pub completed_tasks: usize,

    /// Failed task key -> error text
    pub failed_tasks: BTreeMap<String, String>,

    /// Total number of records
    pub total_records: usize,

    /// Record count per category
    pub records_by_category: BTreeMap<String, usize>,

    /// Record count per year
    pub records_by_year: BTreeMap<i32, usize>,

    /// Number of cached detail pages
    pub cached_details: usize,

    /// Cached detail pages with neither poster nor description
    pub empty_details: usize,
}

impl CheckpointStatistics {
    /// Builds statistics from a loaded checkpoint
    ///
    /// # Arguments
    ///
    /// * `state` - The checkpoint to summarize
    /// * `total_tasks` - Size of the configured task list
    pub fn from_checkpoint(state: &CheckpointState, total_tasks: usize) -> Self {
        let mut records_by_category = BTreeMap::new();
        let mut records_by_year = BTreeMap::new();
        for record in &state.records {
            *records_by_category.entry(record.category.clone()).or_insert(0) += 1;
            *records_by_year.entry(record.year).or_insert(0) += 1;
        }

        Self {
            schema_version: state.schema_version,
            fingerprint: state.config_fingerprint.to_string(),
            fingerprint_digest: state.config_fingerprint.digest(),
            saved_at: state.saved_at,
            total_tasks,
            completed_tasks: state.completed_tasks.len(),
            failed_tasks: state.failed_tasks.clone(),
            total_records: state.records.len(),
            records_by_category,
            records_by_year,
            cached_details: state.detail_cache.len(),
            empty_details: state.detail_cache.empty_entries(),
        }
    }

    /// Tasks neither completed nor failed
    pub fn pending_tasks(&self) -> usize {
        self.total_tasks
            .saturating_sub(self.completed_tasks + self.failed_tasks.len())
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CheckpointStatistics) {
    println!("=== Checkpoint Statistics ===\n");

    println!("Overview:");
    println!("  Schema version: {}", stats.schema_version);
    println!("  Configuration: {}", stats.fingerprint);
    println!("  Fingerprint digest: {}", stats.fingerprint_digest);
    match stats.saved_at {
        Some(saved_at) => println!("  Saved at: {}", saved_at.to_rfc3339()),
        None => println!("  Saved at: unknown"),
    }
    println!();

    println!("Tasks:");
    println!("  Total: {}", stats.total_tasks);
    println!("  Completed: {}", stats.completed_tasks);
    println!("  Failed: {}", stats.failed_tasks.len());
    println!("  Pending: {}", stats.pending_tasks());
    println!();

    if !stats.failed_tasks.is_empty() {
        println!("Failed Tasks:");
        for (key, error) in &stats.failed_tasks {
            println!("  - {}: {}", key, error);
        }
        println!();
    }

    println!("Records: {}", stats.total_records);
    let mut by_category: Vec<_> = stats.records_by_category.iter().collect();
    by_category.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (category, count) in by_category {
        println!("  {}: {}", category, count);
    }
    println!();

    if !stats.records_by_year.is_empty() {
        println!("Records by Year:");
        for (year, count) in &stats.records_by_year {
            println!("  {}: {}", year, count);
        }
        println!();
    }

    let enriched = stats.cached_details - stats.empty_details.min(stats.cached_details);
    let enrichment_rate = if stats.cached_details > 0 {
        (enriched as f64 / stats.cached_details as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Detail Cache: {} pages ({} empty, {:.1}% enriched)",
        stats.cached_details, stats.empty_details, enrichment_rate
    );
}
