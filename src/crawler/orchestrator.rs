//! Crawl orchestrator - main task loop
//!
//! This module drives a run from start to finish:
//! - Restoring state from a checkpoint when resuming
//! - Paginating each task's listing pages and deduplicating titles
//! - Resolving detail pages through the worker pool
//! - Persisting the checkpoint and failed-task report after every task
//! - Pausing, handling interruption, and writing the final artifacts
//! - Applying manual overrides (forced completion, record import)

use crate::config::{validate, Config, ConfigFingerprint};
use crate::crawler::adapter::{SiteAdapter, WikipediaCategoryAdapter};
use crate::crawler::client::PageClient;
use crate::crawler::pool::DetailFetchPool;
use crate::crawler::tasks::{tasks_for_config, Task};
use crate::output::{write_failed_report, write_records};
use crate::state::{sort_records, DedupeIndex, DetailCache, DetailEntry, Record, TaskState};
use crate::storage::{CheckpointState, CheckpointStore, JsonCheckpointStore};
use crate::{HarvestError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a run ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every task in the run's queue was resolved
    #[default]
    Finished,
    /// Stopped after the configured number of resolved tasks
    Paused,
    /// Stopped because the cancellation token fired
    Interrupted,
}

/// Counters describing a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Tasks that completed during this run
    pub tasks_completed: usize,
    /// Tasks that failed during this run
    pub tasks_failed: usize,
    /// Tasks skipped because a checkpoint already had them completed
    pub tasks_skipped: usize,
    /// Records created during this run
    pub records_added: usize,
    /// Records held after the run (including restored ones)
    pub records_total: usize,
    /// Detail pages fetched successfully
    pub details_fetched: usize,
    /// Detail pages that failed and were cached empty
    pub detail_failures: usize,
}

/// Result of a manual record import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records whose dedupe key was new
    pub added: usize,
    /// Records that replaced an existing record with the same key
    pub replaced: usize,
}

/// Main crawl orchestrator
pub struct Orchestrator {
    config: Config,
    tasks: Vec<Task>,
    fingerprint: ConfigFingerprint,
    client: PageClient,
    adapter: Arc<dyn SiteAdapter>,
    pool: DetailFetchPool,
    store: Box<dyn CheckpointStore>,
    completed: BTreeSet<String>,
    failed: BTreeMap<String, String>,
    records: Vec<Record>,
    dedupe: DedupeIndex,
    cache: DetailCache,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Creates an orchestrator with the default site adapter and a JSON
    /// checkpoint at the configured path
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration (validated here)
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to run, with checkpoint state restored
    ///   when resuming
    /// * `Err(HarvestError)` - Invalid configuration or unusable checkpoint
    ///
    /// # Example
    ///
    /// ```no_run
    /// use catalog_harvest::config::load_config;
    /// use catalog_harvest::Orchestrator;
    /// use std::path::Path;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = load_config(Path::new("harvest.toml"))?;
    /// let mut orchestrator = Orchestrator::new(config)?;
    /// let report = orchestrator.run().await?;
    /// println!("{} records", report.records_total);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        let adapter = Arc::new(WikipediaCategoryAdapter::from_config(&config.site)?);
        let store = Box::new(JsonCheckpointStore::new(&config.run.checkpoint_path));
        Self::with_components(config, adapter, store)
    }

    /// Creates an orchestrator with a custom site adapter and checkpoint
    /// store
    ///
    /// The checkpoint is loaded (and its fingerprint checked) when
    /// `run.resume` or `run.failed_only` is set.
    pub fn with_components(
        config: Config,
        adapter: Arc<dyn SiteAdapter>,
        store: Box<dyn CheckpointStore>,
    ) -> Result<Self> {
        validate(&config)?;

        let tasks = tasks_for_config(&config.crawl);
        let fingerprint = ConfigFingerprint::from_config(&config);
        let client = PageClient::new(&config.fetch)?;
        let pool = DetailFetchPool::new(
            client.clone(),
            Arc::clone(&adapter),
            config.fetch.detail_workers,
        );

        let mut orchestrator = Self {
            config,
            tasks,
            fingerprint,
            client,
            adapter,
            pool,
            store,
            completed: BTreeSet::new(),
            failed: BTreeMap::new(),
            records: Vec::new(),
            dedupe: DedupeIndex::new(),
            cache: DetailCache::new(),
            cancel: CancellationToken::new(),
        };

        if orchestrator.config.run.resume || orchestrator.config.run.failed_only {
            match orchestrator.store.load(&orchestrator.fingerprint)? {
                Some(state) => orchestrator.restore(state),
                None => tracing::info!(
                    "No checkpoint at {}, starting fresh",
                    orchestrator.store.path().display()
                ),
            }
        } else if orchestrator.store.path().exists() {
            tracing::warn!(
                "Starting fresh; existing checkpoint at {} will be overwritten (use --resume to continue it)",
                orchestrator.store.path().display()
            );
        }

        tracing::info!(
            "Configuration {} (fingerprint {})",
            orchestrator.fingerprint,
            &orchestrator.fingerprint.digest()[..12]
        );

        Ok(orchestrator)
    }

    fn restore(&mut self, state: CheckpointState) {
        tracing::info!(
            "Resuming from {}: {} completed, {} failed, {} records, {} cached details",
            self.store.path().display(),
            state.completed_tasks.len(),
            state.failed_tasks.len(),
            state.records.len(),
            state.detail_cache.len()
        );

        self.dedupe = DedupeIndex::from_records(&state.records);
        self.completed = state.completed_tasks;
        self.failed = state.failed_tasks;
        self.records = state.records;
        self.cache = state.detail_cache;
    }

    /// Token that stops the run at the next task boundary when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ordered task list for this configuration
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn fingerprint(&self) -> &ConfigFingerprint {
        &self.fingerprint
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn completed_tasks(&self) -> &BTreeSet<String> {
        &self.completed
    }

    /// Failed task key -> error text
    pub fn failed_tasks(&self) -> &BTreeMap<String, String> {
        &self.failed
    }

    pub fn detail_cache(&self) -> &DetailCache {
        &self.cache
    }

    /// Current state of a task as seen between runs
    pub fn task_state(&self, task: &Task) -> TaskState {
        let key = task.key();
        if self.completed.contains(&key) {
            TaskState::Completed
        } else if self.failed.contains_key(&key) {
            TaskState::Failed
        } else {
            TaskState::Pending
        }
    }

    /// Forces a task to Completed without running it
    ///
    /// # Arguments
    ///
    /// * `key` - Task key in `<year>:<category>` form
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The task is now completed (and no longer failed)
    /// * `Err(HarvestError::UnknownTask)` - The key is not in this run's task list
    pub fn mark_completed(&mut self, key: &str) -> Result<()> {
        if !self.tasks.iter().any(|task| task.key() == key) {
            return Err(HarvestError::UnknownTask(key.to_string()));
        }

        self.completed.insert(key.to_string());
        if self.failed.remove(key).is_some() {
            tracing::info!("Task {} marked completed (was failed)", key);
        } else {
            tracing::info!("Task {} marked completed", key);
        }
        Ok(())
    }

    /// Merges manually curated records into the run
    ///
    /// A record replaces any existing record with the same dedupe key. Its
    /// key is registered so crawling never adds a duplicate, and any detail
    /// data it carries overrides the cached entry for its detail URL.
    pub fn import_records(&mut self, records: Vec<Record>) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for record in records {
            let key = record.dedupe_key();

            let detail = DetailEntry::new(record.poster.clone(), record.description.clone());
            if !detail.is_empty() && !record.detail_url.is_empty() {
                self.cache.seed(record.detail_url.clone(), detail);
            }

            match self.records.iter().position(|r| r.dedupe_key() == key) {
                Some(index) => {
                    tracing::debug!("Import replaces {} ({})", record.title, record.year);
                    self.records[index] = record;
                    summary.replaced += 1;
                }
                None => {
                    self.records.push(record);
                    summary.added += 1;
                }
            }
            self.dedupe.insert(key);
        }

        tracing::info!(
            "Imported records: {} added, {} replaced",
            summary.added,
            summary.replaced
        );
        summary
    }

    fn snapshot(&self) -> CheckpointState {
        let mut state = CheckpointState::new(self.fingerprint.clone());
        state.completed_tasks = self.completed.clone();
        state.failed_tasks = self.failed.clone();
        state.records = self.records.clone();
        state.detail_cache = self.cache.clone();
        state
    }

    /// Saves the checkpoint and rewrites the failed-task report
    pub fn persist(&self) -> Result<()> {
        self.store.save(&self.snapshot())?;
        write_failed_report(Path::new(&self.config.run.failed_report_path), &self.failed)?;
        Ok(())
    }

    /// Sorts the records and writes the record file
    pub fn write_outputs(&mut self) -> Result<()> {
        sort_records(&mut self.records);
        write_records(
            Path::new(&self.config.run.output_path),
            &self.records,
            self.config.run.format(),
        )?;
        tracing::info!(
            "Wrote {} records to {}",
            self.records.len(),
            self.config.run.output_path
        );
        Ok(())
    }

    fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.config.fetch.politeness_delay_ms)
    }

    /// Runs the task loop
    ///
    /// Tasks run one at a time in enumeration order. Completed tasks are
    /// skipped; with `failed_only` only the failed tasks run. After each
    /// task the checkpoint is saved. The run stops early when the pause
    /// threshold is reached or the cancellation token fires; either way the
    /// record file, failed report and checkpoint are written before
    /// returning.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - How the run ended and what it did
    /// * `Err(HarvestError)` - A checkpoint or output file could not be written
    pub async fn run(&mut self) -> Result<RunReport> {
        let queue: Vec<Task> = if self.config.run.failed_only {
            self.tasks
                .iter()
                .filter(|task| self.failed.contains_key(&task.key()))
                .cloned()
                .collect()
        } else {
            self.tasks.clone()
        };

        tracing::info!(
            "Starting run: {} tasks queued ({} already completed, {} previously failed), {} detail workers",
            queue.len(),
            self.completed.len(),
            self.failed.len(),
            self.pool.workers()
        );

        let mut report = RunReport::default();
        let pause_after = self.config.run.pause_after;
        let delay = self.politeness_delay();
        let mut resolved = 0;

        for (index, task) in queue.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!("Interrupted before task {}", task);
                report.outcome = RunOutcome::Interrupted;
                break;
            }

            if self.task_state(task).is_success() {
                tracing::debug!("Skipping completed task {}", task);
                report.tasks_skipped += 1;
                continue;
            }

            tracing::info!("[{}/{}] Task {}", index + 1, queue.len(), task);
            let state = self.execute_task(task, &mut report).await;
            tracing::debug!("Task {} -> {}", task, state);
            self.persist()?;
            if state.is_terminal() {
                resolved += 1;
            }

            let is_last = index + 1 == queue.len();
            if pause_after > 0 && resolved >= pause_after && !is_last {
                tracing::info!("Pausing after {} resolved tasks", resolved);
                report.outcome = RunOutcome::Paused;
                break;
            }

            if !is_last && !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => {
                        tracing::warn!("Interrupted after task {}", task);
                        report.outcome = RunOutcome::Interrupted;
                        break;
                    }
                }
            }
        }

        self.write_outputs()?;
        self.persist()?;

        report.records_total = self.records.len();
        tracing::info!(
            "Run {:?}: {} completed, {} failed, {} skipped, {} new records ({} total)",
            report.outcome,
            report.tasks_completed,
            report.tasks_failed,
            report.tasks_skipped,
            report.records_added,
            report.records_total
        );

        Ok(report)
    }

    /// Runs one task and records its outcome
    async fn execute_task(&mut self, task: &Task, report: &mut RunReport) -> TaskState {
        let key = task.key();
        tracing::debug!("Task {} -> {}", task, TaskState::Running);

        self.dedupe.begin_task();
        match self.paginate(task, report).await {
            Ok(staged) => {
                self.dedupe.commit_task();
                tracing::info!("Task {} completed with {} new records", task, staged.len());
                report.records_added += staged.len();
                report.tasks_completed += 1;
                self.records.extend(staged);
                self.failed.remove(&key);
                self.completed.insert(key);
                TaskState::Completed
            }
            Err(e) => {
                self.dedupe.rollback_task();
                let message = match e {
                    HarvestError::Fetch(fetch) => fetch.to_string(),
                    other => other.to_string(),
                };
                tracing::warn!("Task {} failed: {}", task, message);
                report.tasks_failed += 1;
                self.failed.insert(key, message);
                TaskState::Failed
            }
        }
    }

    /// Walks a task's listing pages and stages a record for every new title
    async fn paginate(&mut self, task: &Task, report: &mut RunReport) -> Result<Vec<Record>> {
        let mut staged = Vec::new();
        let mut visited = HashSet::new();
        let mut next_url = Some(self.adapter.listing_url(task)?);
        let mut page_number = 0;

        while let Some(page_url) = next_url.take() {
            if !visited.insert(page_url.clone()) {
                tracing::warn!("Pagination for {} loops back to {}; stopping", task, page_url);
                break;
            }

            if page_number > 0 && !self.politeness_delay().is_zero() {
                tokio::time::sleep(self.politeness_delay()).await;
            }
            page_number += 1;

            let html = match self.client.fetch_text(&page_url).await {
                Ok(html) => html,
                Err(e) if page_number == 1 && e.is_not_found() => {
                    tracing::warn!("No listing for {} ({}); completing with no records", task, e);
                    return Ok(staged);
                }
                Err(e) => return Err(e.into()),
            };

            let listing = self.adapter.parse_listing(&html);
            let found = listing.entries.len();
            let accepted: Vec<_> = listing
                .entries
                .into_iter()
                .filter(|entry| self.dedupe.accept(task.year, &entry.title))
                .collect();

            let urls = accepted.iter().map(|e| e.detail_url.clone()).collect();
            let stats = self.pool.resolve(urls, &mut self.cache).await;
            report.details_fetched += stats.fetched;
            report.detail_failures += stats.failed;

            tracing::info!(
                "{} page {}: {} entries, {} new, {} details fetched",
                task,
                page_number,
                found,
                accepted.len(),
                stats.fetched
            );

            for entry in accepted {
                let detail = self
                    .cache
                    .get(&entry.detail_url)
                    .cloned()
                    .unwrap_or_default();
                staged.push(Record {
                    year: task.year,
                    category: task.category.clone(),
                    title: entry.title,
                    detail_url: entry.detail_url,
                    poster: detail.poster,
                    description: detail.description,
                    source_url: page_url.clone(),
                });
            }

            next_url = listing.next_page;
        }

        Ok(staged)
    }
}
