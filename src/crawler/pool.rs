//! Bounded-concurrency detail page fetching
//!
//! Detail pages are the only part of a run fetched in parallel. Each URL is
//! fetched on its own tokio task; `buffer_unordered` keeps at most
//! `workers` of them in flight. Results flow back to the caller's task,
//! which is the only place the `DetailCache` is written.

use crate::crawler::adapter::SiteAdapter;
use crate::crawler::client::PageClient;
use crate::state::{DetailCache, DetailEntry};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Counters for one pool invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Distinct URLs that were not cached and had to be fetched
    pub requested: usize,
    /// Fetches that produced a page
    pub fetched: usize,
    /// Fetches that failed and were cached as empty entries
    pub failed: usize,
}

/// Fixed-size pool of detail page workers
#[derive(Clone)]
pub struct DetailFetchPool {
    client: PageClient,
    adapter: Arc<dyn SiteAdapter>,
    workers: usize,
}

impl DetailFetchPool {
    /// Creates a pool
    ///
    /// # Arguments
    ///
    /// * `client` - Client shared by all workers
    /// * `adapter` - Parses fetched detail pages
    /// * `workers` - Maximum concurrent fetches (values below 1 are treated as 1)
    pub fn new(client: PageClient, adapter: Arc<dyn SiteAdapter>, workers: usize) -> Self {
        Self {
            client,
            adapter,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fetches every URL not already in the cache and caches the results
    ///
    /// Duplicate URLs in `urls` are fetched once. A failed fetch (or a
    /// worker that panicked) is cached as an empty entry so the URL is never
    /// retried; it is logged but never returned as an error.
    ///
    /// # Arguments
    ///
    /// * `urls` - Detail URLs referenced by freshly accepted titles
    /// * `cache` - The run's detail cache
    ///
    /// # Returns
    ///
    /// Counters describing the work done
    pub async fn resolve(&self, urls: Vec<String>, cache: &mut DetailCache) -> PoolStats {
        let mut queued = HashSet::new();
        let pending: Vec<String> = urls
            .into_iter()
            .filter(|url| !cache.contains(url) && queued.insert(url.clone()))
            .collect();

        let mut stats = PoolStats {
            requested: pending.len(),
            ..PoolStats::default()
        };
        if pending.is_empty() {
            return stats;
        }

        tracing::debug!(
            "Fetching {} detail pages with {} workers",
            pending.len(),
            self.workers
        );

        let mut results = stream::iter(pending)
            .map(|url| {
                let client = self.client.clone();
                let adapter = Arc::clone(&self.adapter);
                let target = url.clone();
                // Spawned so fetches progress even while the stream isn't polled
                let handle = tokio::spawn(async move {
                    let html = client.fetch_text(&target).await?;
                    Ok::<_, crate::crawler::FetchError>(adapter.parse_detail(&html))
                });
                async move { (url, handle.await) }
            })
            .buffer_unordered(self.workers);

        while let Some((url, joined)) = results.next().await {
            let entry = match joined {
                Ok(Ok(entry)) => {
                    stats.fetched += 1;
                    entry
                }
                Ok(Err(e)) if e.is_timeout() => {
                    tracing::warn!("Details fetch timed out for {}; using empty poster/description", url);
                    stats.failed += 1;
                    DetailEntry::default()
                }
                Ok(Err(e)) => {
                    tracing::warn!("Details fetch failed; using empty poster/description: {}", e);
                    stats.failed += 1;
                    DetailEntry::default()
                }
                Err(join_err) => {
                    tracing::warn!("Detail worker for {} aborted: {}", url, join_err);
                    stats.failed += 1;
                    DetailEntry::default()
                }
            };
            cache.insert(url, entry);
        }

        stats
    }
}
