//! JSON file checkpoint implementation
//!
//! This module provides a file-backed implementation of the CheckpointStore
//! trait. Snapshots are written to a sibling temporary file, flushed, and
//! renamed over the checkpoint so readers only ever see a complete file.

use crate::storage::schema::{
    migrate_v1_to_v2, CheckpointState, LegacyCheckpointV1, CURRENT_SCHEMA_VERSION,
    LEGACY_SCHEMA_VERSION,
};
use crate::storage::traits::{CheckpointError, CheckpointResult, CheckpointStore};
use chrono::Utc;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON file checkpoint backend
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    /// Creates a store for the given checkpoint path
    ///
    /// Nothing is read or written until `save`/`read` are called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn save(&self, state: &CheckpointState) -> CheckpointResult<()> {
        let mut snapshot = state.clone();
        snapshot.schema_version = CURRENT_SCHEMA_VERSION;
        snapshot.saved_at = Some(Utc::now());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            serde_json::to_writer_pretty(&mut file, &snapshot)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!(
            "Checkpoint saved to {} ({} completed, {} failed, {} records)",
            self.path.display(),
            snapshot.completed_tasks.len(),
            snapshot.failed_tasks.len(),
            snapshot.records.len()
        );
        Ok(())
    }

    fn read(&self) -> CheckpointResult<Option<CheckpointState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let raw: Value = serde_json::from_str(&content)?;
        Ok(Some(decode_checkpoint(raw)?))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Decodes a checkpoint document of any supported schema version
fn decode_checkpoint(raw: Value) -> CheckpointResult<CheckpointState> {
    if let Some(version) = raw.get("schemaVersion").and_then(Value::as_u64) {
        if version != u64::from(CURRENT_SCHEMA_VERSION) {
            return Err(CheckpointError::UnsupportedSchema(version));
        }
        return Ok(serde_json::from_value(raw)?);
    }

    match raw.get("version").and_then(Value::as_u64) {
        Some(version) if version == u64::from(LEGACY_SCHEMA_VERSION) => {
            let legacy: LegacyCheckpointV1 = serde_json::from_value(raw)?;
            tracing::info!("Migrating legacy checkpoint (schema v1 -> v2)");
            Ok(migrate_v1_to_v2(legacy))
        }
        Some(version) => Err(CheckpointError::UnsupportedSchema(version)),
        None => Err(CheckpointError::MissingVersion),
    }
}
