//! Catalog-Harvest: a resumable crawler for paginated web catalogs
//!
//! This crate walks a site's category listing pages (one task per
//! year/category pair), deduplicates the titles it finds, enriches them from
//! their detail pages with a bounded worker pool, and checkpoints progress
//! after every task so an interrupted run can pick up where it left off.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] storage::CheckpointError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Import error: {0}")]
    Import(#[from] output::ImportError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown task key '{0}' (expected <year>:<category> from the configured range)")]
    UnknownTask(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown category '{0}' (no listing template configured)")]
    UnknownCategory(String),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, ConfigFingerprint};
pub use crawler::{Orchestrator, RunOutcome, RunReport, Task};
pub use state::{DedupeIndex, DetailCache, DetailEntry, Record, TaskState};
pub use storage::{CheckpointState, CheckpointStore, JsonCheckpointStore};
