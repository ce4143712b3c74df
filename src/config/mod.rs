//! Configuration module for Catalog-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and derives the fingerprint that guards checkpoint resumption.
//!
//! # Example
//!
//! ```no_run
//! use catalog_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling {}-{}", config.crawl.start_year, config.crawl.end_year);
//! ```

mod fingerprint;
mod parser;
mod types;
mod validation;

// Re-export types
pub use fingerprint::ConfigFingerprint;
pub use types::{
    Config, CrawlConfig, FetchConfig, OutputFormat, RunConfig, SiteConfig, DEFAULT_BASE_URL,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
