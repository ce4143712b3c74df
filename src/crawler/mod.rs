//! Crawler module for catalog page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a fixed user agent and timeout
//! - Site adapters that extract listing entries and detail data
//! - Task enumeration from configuration
//! - Bounded-concurrency detail page fetching
//! - Overall run orchestration with checkpointing

mod adapter;
mod client;
mod orchestrator;
mod pool;
mod tasks;

pub use adapter::{ListingEntry, ListingPage, SiteAdapter, WikipediaCategoryAdapter};
pub use client::{FetchError, PageClient};
pub use orchestrator::{ImportSummary, Orchestrator, RunOutcome, RunReport};
pub use pool::{DetailFetchPool, PoolStats};
pub use tasks::{dedupe_categories, enumerate_tasks, prioritize_categories, tasks_for_config, Task};
