//! Detail-page enrichment with a bounded fetch pool and a TTL cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, trace};

use polisradar_core::DetailFields;

use crate::client::{DETAIL_TIMEOUT, PolisenClient};
use crate::error::{FeedError, FeedResult};
use crate::scrape::extract_detail_fields;
use crate::source::{BoxFuture, DetailSource};

/// Lifetime of a cached detail-page extraction.
pub const DETAILS_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Maximum detail fetches in flight across one refresh cycle.
pub const MAX_CONCURRENT_DETAIL_FETCHES: usize = 4;

#[derive(Debug, Clone)]
struct DetailsCacheEntry {
    fields: DetailFields,
    fetched_at: Instant,
}

impl DetailsCacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }
}

/// TTL cache of scraped detail fields, keyed by event id.
///
/// Entries past their TTL are treated as absent; inserting over an
/// existing id overwrites it. Never persisted across restarts.
#[derive(Debug)]
pub struct DetailsCache {
    ttl: Duration,
    entries: HashMap<i64, DetailsCacheEntry>,
}

impl Default for DetailsCache {
    fn default() -> Self {
        Self::new(DETAILS_TTL)
    }
}

impl DetailsCache {
    /// Creates a cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the fields for an event if present and not expired.
    pub fn get_valid(&self, event_id: i64) -> Option<DetailFields> {
        self.entries
            .get(&event_id)
            .filter(|entry| !entry.is_expired(self.ttl))
            .map(|entry| entry.fields.clone())
    }

    /// Inserts or overwrites the fields for an event, resetting its age.
    pub fn insert(&mut self, event_id: i64, fields: DetailFields) {
        self.entries.insert(
            event_id,
            DetailsCacheEntry {
                fields,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Removes all expired entries and returns how many were dropped.
    pub fn evict_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
        before - self.entries.len()
    }

    /// Returns the number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches and caches detail-page fields.
///
/// At most [`MAX_CONCURRENT_DETAIL_FETCHES`] requests are in flight at any
/// moment, across every area of a refresh cycle. Results are cached per
/// event id for [`DETAILS_TTL`]; an extraction that finds nothing is a
/// scrape error and is not cached, so the next cycle retries it.
#[derive(Debug)]
pub struct DetailEnricher {
    client: PolisenClient,
    cache: Mutex<DetailsCache>,
    limiter: Semaphore,
}

impl DetailEnricher {
    /// Creates an enricher with the default TTL.
    pub fn new(client: PolisenClient) -> Self {
        Self::with_ttl(client, DETAILS_TTL)
    }

    /// Creates an enricher with a custom cache TTL.
    pub fn with_ttl(client: PolisenClient, ttl: Duration) -> Self {
        Self {
            client,
            cache: Mutex::new(DetailsCache::new(ttl)),
            limiter: Semaphore::new(MAX_CONCURRENT_DETAIL_FETCHES),
        }
    }

    /// Returns the number of cached extractions.
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn fetch(&self, event_id: i64, url: &str) -> FeedResult<DetailFields> {
        if let Some(fields) = self.cache.lock().await.get_valid(event_id) {
            trace!(event_id, "details cache hit");
            return Ok(fields);
        }

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FeedError::network("detail fetch limiter closed"))?;

        let response = self
            .client
            .http()
            .get(url)
            .timeout(DETAIL_TIMEOUT)
            .send()
            .await
            .map_err(FeedError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::status(format!(
                "detail page returned HTTP {status}"
            )));
        }

        let html = response.text().await.map_err(FeedError::transport)?;
        let fields = extract_detail_fields(&html);
        if fields.is_empty() {
            return Err(FeedError::scrape("no recognizable detail markers"));
        }

        self.cache.lock().await.insert(event_id, fields.clone());
        debug!(event_id, "scraped detail fields");
        Ok(fields)
    }
}

impl DetailSource for DetailEnricher {
    fn fetch_details<'a>(
        &'a self,
        event_id: i64,
        url: &'a str,
    ) -> BoxFuture<'a, FeedResult<DetailFields>> {
        Box::pin(self.fetch(event_id, url))
    }
}
