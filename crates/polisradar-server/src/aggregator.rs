//! Per-area fetch, filter, rank, trim and enrich.
//!
//! The aggregator runs one refresh cycle: it fans out one fetch per
//! configured area, windows and ranks the results, trims them under the
//! "all of today is always kept" policy, enriches the survivors from their
//! detail pages and emits a complete [`Snapshot`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, warn};

use polisradar_core::{
    AreaBucket, DayGroup, EnrichedEvent, RawEvent, Snapshot, area_matches, day_group,
    parse_event_time_from_title, parse_feed_timestamp,
};
use polisradar_feed::{DetailSource, EventSource, FeedResult, resolve_event_url};

use crate::config::RadarConfig;

/// Turns raw feed pulls into the per-area snapshot for one refresh cycle.
pub struct Aggregator {
    config: RadarConfig,
    areas: Vec<String>,
    origin: String,
    events: Arc<dyn EventSource>,
    details: Arc<dyn DetailSource>,
}

impl Aggregator {
    /// Creates an aggregator over the given sources.
    pub fn new(
        config: RadarConfig,
        events: Arc<dyn EventSource>,
        details: Arc<dyn DetailSource>,
    ) -> Self {
        let areas = config.areas();
        Self {
            config,
            areas,
            origin: polisradar_feed::FEED_ORIGIN.to_string(),
            events,
            details,
        }
    }

    /// Builder: override the origin used to resolve relative event URLs.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// The deduplicated area filters this aggregator queries.
    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    /// Runs one refresh cycle against the current clock.
    ///
    /// # Errors
    ///
    /// A failed area degrades to an empty bucket; the cycle itself fails
    /// only when every configured area failed.
    pub async fn refresh(&self) -> FeedResult<Snapshot> {
        self.refresh_at(Utc::now()).await
    }

    /// Runs one refresh cycle with an explicit clock.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> FeedResult<Snapshot> {
        let results = join_all(
            self.areas
                .iter()
                .map(|area| self.refresh_area(area, now)),
        )
        .await;

        let mut snapshot = Snapshot::new(now);
        let mut failures = 0;
        let mut last_error = None;

        for (area, result) in self.areas.iter().zip(results) {
            match result {
                Ok(bucket) => snapshot.insert(bucket),
                Err(e) => {
                    warn!(area = %area, error = %e, "area fetch failed, publishing empty bucket");
                    failures += 1;
                    last_error = Some(e);
                    snapshot.insert(AreaBucket::empty(area.clone()));
                }
            }
        }

        if failures == self.areas.len()
            && let Some(error) = last_error
        {
            return Err(error);
        }
        Ok(snapshot)
    }

    async fn refresh_area(&self, area: &str, now: DateTime<Utc>) -> FeedResult<AreaBucket> {
        let scope = (!area.is_empty()).then_some(area);
        let raw = self.events.fetch_events(scope).await?;

        let mut events = self.select_events(area, raw, now);
        let count = events.len();

        sort_ranked(&mut events, now);
        let events = trim_ranked(events, self.config.max_items, now);
        let events = self.enrich(events).await;

        debug!(area = %area, count, kept = events.len(), "aggregated area");
        Ok(AreaBucket::new(area.to_string(), count, events))
    }

    /// Applies the time window and the client-side area match, and derives
    /// each survivor's best-effort occurrence time.
    fn select_events(
        &self,
        area: &str,
        raw: Vec<RawEvent>,
        now: DateTime<Utc>,
    ) -> Vec<EnrichedEvent> {
        let cutoff = now - self.config.window();

        raw.into_iter()
            .filter_map(|event| {
                let published = parse_feed_timestamp(event.datetime.as_deref().unwrap_or(""))?;
                if published.with_timezone(&Utc) < cutoff {
                    return None;
                }
                if !area_matches(event.location_name(), area, self.config.match_mode) {
                    return None;
                }

                let name = event.name.clone().unwrap_or_default();
                let occurred = parse_event_time_from_title(&name, published);

                let mut enriched = EnrichedEvent::new(event.id, name, published, occurred);
                enriched.summary = event.summary;
                enriched.event_type = event.event_type;
                enriched.url = event
                    .url
                    .as_deref()
                    .and_then(|url| resolve_event_url(&self.origin, url));
                enriched.location_name = event.location.and_then(|location| location.name);
                Some(enriched)
            })
            .collect()
    }

    /// Enriches events concurrently; the detail source bounds the number
    /// of fetches actually in flight. Failures leave the event as-is.
    async fn enrich(&self, events: Vec<EnrichedEvent>) -> Vec<EnrichedEvent> {
        join_all(events.into_iter().map(|mut event| async move {
            let Some(url) = event.url.clone() else {
                return event;
            };
            match self.details.fetch_details(event.id, &url).await {
                Ok(fields) => event.details = Some(fields),
                Err(e) => {
                    debug!(event_id = event.id, error = %e, "detail enrichment skipped");
                }
            }
            event
        }))
        .await
    }
}

/// Sorts events by day group (today first), then by publish time, newest
/// first within each group.
pub fn sort_ranked(events: &mut [EnrichedEvent], now: DateTime<Utc>) {
    events.sort_by(|a, b| {
        day_group(a.published, now)
            .cmp(&day_group(b.published, now))
            .then_with(|| b.published.cmp(&a.published))
    });
}

/// Applies the trim policy to an already sorted list.
///
/// Every today-event is kept, even past `max_items`; the remaining
/// capacity, floored at zero, is filled from the rest in sorted order.
pub fn trim_ranked(
    events: Vec<EnrichedEvent>,
    max_items: usize,
    now: DateTime<Utc>,
) -> Vec<EnrichedEvent> {
    let today = events
        .iter()
        .filter(|event| day_group(event.published, now) == DayGroup::Today)
        .count();
    let keep = today + max_items.saturating_sub(today);
    events.into_iter().take(keep).collect()
}
