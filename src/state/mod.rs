//! State module for tracking crawl progress
//!
//! This module provides the in-memory state the orchestrator owns during a
//! run and snapshots into checkpoints.
//!
//! # Components
//!
//! - `TaskState`: Tracks the lifecycle of individual tasks
//! - `Record`: A deduplicated catalog entry and its ordering rules
//! - `DedupeIndex`: Global and per-task title deduplication
//! - `DetailCache`: Write-once cache of detail page data

mod dedupe;
mod detail_cache;
mod record;
mod task_state;

// Re-export main types
pub use dedupe::DedupeIndex;
pub use detail_cache::{DetailCache, DetailEntry};
pub use record::{fold_title, sort_records, DedupeKey, Record};
pub use task_state::TaskState;
