//! Snapshot projections for host consumption.
//!
//! Adapters only read the latest [`Snapshot`]; they never fetch. The
//! per-area adapter exposes its bucket verbatim. The all-areas adapter
//! re-derives the global day grouping over the union of every bucket and
//! re-applies the same trim policy, which is more than a merge of per-area
//! "latest" values.

use serde::Serialize;

use polisradar_core::{EnrichedEvent, MatchMode, Snapshot};

use crate::aggregator::{sort_ranked, trim_ranked};
use crate::config::RadarConfig;

/// Attribute payload shared by the per-area and all-areas readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaAttributes {
    /// The area this reading is bound to; the configured specification
    /// string for the all-areas reading.
    pub area: String,
    /// Active match mode.
    pub match_mode: MatchMode,
    /// Active time window in hours.
    pub hours: u32,
    /// Active per-area cap.
    pub max_items: usize,
    /// Active refresh interval in minutes.
    pub update_interval: u64,
    /// Events in the window before trimming.
    pub count: usize,
    /// Most relevant event.
    pub latest: Option<EnrichedEvent>,
    /// Ordered events.
    pub events: Vec<EnrichedEvent>,
}

/// One projected reading: the headline of the most relevant event plus the
/// full attribute payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaReading {
    /// Latest event headline, absent when the bucket is empty.
    pub value: Option<String>,
    /// Full attribute payload.
    pub attributes: AreaAttributes,
}

/// Projects one configured area's bucket out of the latest snapshot.
#[derive(Debug, Clone)]
pub struct AreaAdapter {
    area: String,
    config: RadarConfig,
}

impl AreaAdapter {
    /// Creates an adapter bound to one configured area.
    pub fn new(area: impl Into<String>, config: RadarConfig) -> Self {
        Self {
            area: area.into(),
            config,
        }
    }

    /// The bound area filter.
    pub fn area(&self) -> &str {
        &self.area
    }

    /// Projects the bound area's bucket verbatim.
    ///
    /// A snapshot without a bucket for this area reads as empty.
    pub fn read(&self, snapshot: &Snapshot) -> AreaReading {
        let (count, latest, events) = match snapshot.bucket(&self.area) {
            Some(bucket) => (bucket.count, bucket.latest.clone(), bucket.events.clone()),
            None => (0, None, Vec::new()),
        };

        AreaReading {
            value: latest
                .as_ref()
                .and_then(|event| event.headline().map(str::to_string)),
            attributes: self.attributes(self.area.clone(), count, latest, events),
        }
    }

    fn attributes(
        &self,
        area: String,
        count: usize,
        latest: Option<EnrichedEvent>,
        events: Vec<EnrichedEvent>,
    ) -> AreaAttributes {
        AreaAttributes {
            area,
            match_mode: self.config.match_mode,
            hours: self.config.hours,
            max_items: self.config.max_items,
            update_interval: self.config.update_interval_minutes,
            count,
            latest,
            events,
        }
    }
}

/// Combined view across every configured area.
///
/// Always computed each cycle; hosts keep it hidden by default
/// ([`CombinedAdapter::DEFAULT_ENABLED`]).
#[derive(Debug, Clone)]
pub struct CombinedAdapter {
    config: RadarConfig,
}

impl CombinedAdapter {
    /// Hosts should not display this reading unless asked to.
    pub const DEFAULT_ENABLED: bool = false;

    /// Creates the all-areas adapter.
    pub fn new(config: RadarConfig) -> Self {
        Self { config }
    }

    /// Flattens every bucket, tags events with their source area, dedupes
    /// by event id (first configured area wins), then re-derives the
    /// global grouping/sort and re-applies the trim policy.
    pub fn read(&self, snapshot: &Snapshot) -> AreaReading {
        let now = snapshot.generated_at;

        let mut seen = std::collections::HashSet::new();
        let mut events: Vec<EnrichedEvent> = Vec::new();
        for area in self.config.areas() {
            let Some(bucket) = snapshot.bucket(&area) else {
                continue;
            };
            for event in &bucket.events {
                if !seen.insert(event.id) {
                    continue;
                }
                let mut event = event.clone();
                if !area.is_empty() {
                    event.area = Some(area.clone());
                }
                events.push(event);
            }
        }

        let count = events.len();
        sort_ranked(&mut events, now);
        let events = trim_ranked(events, self.config.max_items, now);
        let latest = events.first().cloned();

        AreaReading {
            value: latest
                .as_ref()
                .and_then(|event| event.headline().map(str::to_string)),
            attributes: AreaAttributes {
                area: self.config.area_spec.clone(),
                match_mode: self.config.match_mode,
                hours: self.config.hours,
                max_items: self.config.max_items,
                update_interval: self.config.update_interval_minutes,
                count,
                latest,
                events,
            },
        }
    }
}
