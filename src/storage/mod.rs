//! Storage module for persisting crawl progress
//!
//! This module handles checkpoint persistence, including:
//! - The checkpoint schema and its legacy migration
//! - Atomic JSON snapshots
//! - Fingerprint verification on resume

mod json;
mod schema;
mod traits;

pub use json::JsonCheckpointStore;
pub use schema::{
    migrate_v1_to_v2, CheckpointState, LegacyCheckpointV1, CURRENT_SCHEMA_VERSION,
    LEGACY_SCHEMA_VERSION,
};
pub use traits::{CheckpointError, CheckpointResult, CheckpointStore};
