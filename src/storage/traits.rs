//! Checkpoint store trait and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::config::ConfigFingerprint;
use crate::storage::CheckpointState;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed checkpoint: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "Checkpoint config mismatch: checkpoint was written for {found}, current run uses {expected}. \
         Re-run with the original --start-year/--end-year/--categories or delete the checkpoint file."
    )]
    ConfigMismatch {
        expected: ConfigFingerprint,
        found: ConfigFingerprint,
    },

    #[error("Unsupported checkpoint schema version {0}; this build reads versions 1 and 2")]
    UnsupportedSchema(u64),

    #[error("Checkpoint has no schema version field")]
    MissingVersion,
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Trait for checkpoint backend implementations
pub trait CheckpointStore: Send {
    /// Writes a snapshot
    ///
    /// A crash while saving must leave the previously saved snapshot intact.
    fn save(&self, state: &CheckpointState) -> CheckpointResult<()>;

    /// Reads the stored snapshot, upgrading older layouts
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Nothing has been saved yet
    /// * `Ok(Some(state))` - The stored snapshot in the current layout
    fn read(&self) -> CheckpointResult<Option<CheckpointState>>;

    /// Reads the stored snapshot and checks it belongs to this configuration
    ///
    /// # Arguments
    ///
    /// * `expected` - Fingerprint of the current run's configuration
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Nothing has been saved yet
    /// * `Ok(Some(state))` - The stored snapshot, fingerprint verified
    /// * `Err(CheckpointError::ConfigMismatch)` - The snapshot belongs to a
    ///   different configuration
    fn load(&self, expected: &ConfigFingerprint) -> CheckpointResult<Option<CheckpointState>> {
        match self.read()? {
            Some(state) if state.config_fingerprint != *expected => {
                Err(CheckpointError::ConfigMismatch {
                    expected: expected.clone(),
                    found: state.config_fingerprint,
                })
            }
            other => Ok(other),
        }
    }

    /// Location of the snapshot, for operator-facing messages
    fn path(&self) -> &Path;
}
