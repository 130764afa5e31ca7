//! Event types for the police events feed.
//!
//! This module provides the data model for one refresh cycle:
//! - [`RawEvent`]: a feed record exactly as supplied upstream
//! - [`DetailFields`]: fields scraped from an event's detail page
//! - [`EnrichedEvent`]: a windowed event with derived occurrence time and
//!   optional detail fields, immutable once produced for a cycle
//! - [`AreaBucket`]: the per-area aggregation result
//! - [`Snapshot`]: the complete, atomically published set of buckets

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A single record from the events feed.
///
/// The feed guarantees nothing beyond integer identity: every other field
/// is tolerated as absent. `datetime` is kept as the raw string so that
/// offset handling stays in the timestamp parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Upstream event identity.
    pub id: i64,
    /// Event title; often embeds the occurrence time as free text.
    #[serde(default)]
    pub name: Option<String>,
    /// One-line summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Event category ("Mordbrand", "Trafikolycka", ...).
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    /// Publish/update timestamp in feed format.
    #[serde(default)]
    pub datetime: Option<String>,
    /// Detail-page URL; may be root-relative.
    #[serde(default)]
    pub url: Option<String>,
    /// Free-text location.
    #[serde(default)]
    pub location: Option<RawLocation>,
}

/// Location block of a feed record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    /// Municipality or county name.
    #[serde(default)]
    pub name: Option<String>,
    /// "lat,lon" pair as supplied by the feed.
    #[serde(default)]
    pub gps: Option<String>,
}

impl RawEvent {
    /// Creates an event with only its identity set.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            summary: None,
            event_type: None,
            datetime: None,
            url: None,
            location: None,
        }
    }

    /// Builder method to set the title.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the event type.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Builder method to set the feed timestamp.
    pub fn with_datetime(mut self, datetime: impl Into<String>) -> Self {
        self.datetime = Some(datetime.into());
        self
    }

    /// Builder method to set the detail-page URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder method to set the location name.
    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location = Some(RawLocation {
            name: Some(name.into()),
            gps: self.location.and_then(|l| l.gps),
        });
        self
    }

    /// Returns the location name, or an empty string when absent.
    pub fn location_name(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|location| location.name.as_deref())
            .unwrap_or("")
    }
}

/// Fields scraped from an event's detail page.
///
/// Every field is extracted independently and best-effort; any subset may
/// be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailFields {
    /// Preamble/lead paragraph.
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Main body, HTML stripped to text.
    #[serde(default)]
    pub body: Option<String>,
    /// Byline, typically the publishing police region.
    #[serde(default)]
    pub sender: Option<String>,
    /// Human-readable published string as shown on the page.
    #[serde(default)]
    pub published_display: Option<String>,
    /// Machine-readable published timestamp.
    #[serde(default)]
    pub published_iso: Option<DateTime<FixedOffset>>,
}

impl DetailFields {
    /// Returns true when extraction produced nothing at all.
    pub fn is_empty(&self) -> bool {
        self.subtitle.is_none()
            && self.body.is_none()
            && self.sender.is_none()
            && self.published_display.is_none()
            && self.published_iso.is_none()
    }
}

/// A windowed event with its derived occurrence time and any scraped
/// detail fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    /// Upstream event identity.
    pub id: i64,
    /// Event title.
    pub name: String,
    /// One-line summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Event category.
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    /// Absolute detail-page URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Free-text location name.
    #[serde(default)]
    pub location_name: Option<String>,
    /// Source area tag; set by the all-areas view for non-empty areas.
    #[serde(default)]
    pub area: Option<String>,
    /// Publish/update timestamp, offset preserved.
    pub published: DateTime<FixedOffset>,
    /// Best-effort occurrence time; falls back to `published`.
    pub occurred: DateTime<FixedOffset>,
    /// Scraped detail fields, when enrichment succeeded.
    #[serde(default)]
    pub details: Option<DetailFields>,
}

impl EnrichedEvent {
    /// Creates an event with required fields; everything else is absent.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        published: DateTime<FixedOffset>,
        occurred: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            summary: None,
            event_type: None,
            url: None,
            location_name: None,
            area: None,
            published,
            occurred,
            details: None,
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the event type.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Builder method to set the absolute URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder method to set the location name.
    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    /// Builder method to set the source-area tag.
    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    /// Builder method to attach detail fields.
    pub fn with_details(mut self, details: DetailFields) -> Self {
        self.details = Some(details);
        self
    }

    /// Returns the trimmed title when it is non-empty.
    pub fn headline(&self) -> Option<&str> {
        let trimmed = self.name.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Per-area aggregation result for one refresh cycle.
///
/// `count` is the number of events that survived the time window before
/// trimming; `events` is the trimmed, enriched list and `latest` is always
/// its first element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaBucket {
    /// The configured area filter this bucket belongs to; empty for the
    /// unfiltered match-all bucket.
    pub area: String,
    /// Events in the window before trimming.
    pub count: usize,
    /// Most relevant event, equal to `events.first()`.
    pub latest: Option<EnrichedEvent>,
    /// Trimmed, ordered events.
    pub events: Vec<EnrichedEvent>,
}

impl AreaBucket {
    /// Creates a bucket from a trimmed event list.
    pub fn new(area: impl Into<String>, count: usize, events: Vec<EnrichedEvent>) -> Self {
        Self {
            area: area.into(),
            count,
            latest: events.first().cloned(),
            events,
        }
    }

    /// Creates an empty bucket, used when an area's fetch failed.
    pub fn empty(area: impl Into<String>) -> Self {
        Self::new(area, 0, Vec::new())
    }
}

/// The complete set of buckets produced by one refresh cycle.
///
/// A snapshot is built in full and only then published; consumers never
/// observe a partially updated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When this cycle ran.
    pub generated_at: DateTime<Utc>,
    /// Buckets keyed by area filter.
    pub buckets: HashMap<String, AreaBucket>,
}

impl Snapshot {
    /// Creates an empty snapshot stamped with the cycle time.
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            buckets: HashMap::new(),
        }
    }

    /// Inserts a bucket, replacing any previous bucket for the same area.
    pub fn insert(&mut self, bucket: AreaBucket) {
        self.buckets.insert(bucket.area.clone(), bucket);
    }

    /// Returns the bucket for an area, if present.
    pub fn bucket(&self, area: &str) -> Option<&AreaBucket> {
        self.buckets.get(area)
    }

    /// Returns the number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns true when the snapshot holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_feed_timestamp;

    fn ts(text: &str) -> DateTime<FixedOffset> {
        parse_feed_timestamp(text).expect("valid fixture timestamp")
    }

    fn sample_event(id: i64) -> EnrichedEvent {
        EnrichedEvent::new(
            id,
            "12 januari 22.16, Mordbrand, Helsingborg",
            ts("2024-01-12 23:00:00 +01:00"),
            ts("2024-01-12 22:16:00 +01:00"),
        )
    }

    mod raw_event {
        use super::*;

        #[test]
        fn lenient_deserialization() {
            let json = r#"{
                "id": 12345,
                "datetime": "2024-01-12 23:00:00 +01:00",
                "name": "12 januari 22.16, Mordbrand, Helsingborg",
                "summary": "Mordbrand",
                "type": "Mordbrand",
                "url": "/aktuellt/handelser/2024/januari/12/mordbrand-helsingborg/",
                "location": {"name": "Helsingborg", "gps": "56.046467,12.694512"}
            }"#;

            let event: RawEvent = serde_json::from_str(json).unwrap();
            assert_eq!(event.id, 12345);
            assert_eq!(event.location_name(), "Helsingborg");
            assert_eq!(event.event_type.as_deref(), Some("Mordbrand"));
        }

        #[test]
        fn tolerates_missing_fields() {
            let event: RawEvent = serde_json::from_str(r#"{"id": 7}"#).unwrap();
            assert_eq!(event.id, 7);
            assert!(event.name.is_none());
            assert!(event.datetime.is_none());
            assert_eq!(event.location_name(), "");
        }

        #[test]
        fn rejects_missing_id() {
            assert!(serde_json::from_str::<RawEvent>(r#"{"name": "x"}"#).is_err());
        }

        #[test]
        fn builder() {
            let event = RawEvent::new(1)
                .with_name("Stöld, Lund")
                .with_datetime("2024-01-12 23:00:00 +01:00")
                .with_location_name("Lund")
                .with_url("/handelse/1/");

            assert_eq!(event.location_name(), "Lund");
            assert_eq!(event.url.as_deref(), Some("/handelse/1/"));
        }
    }

    mod detail_fields {
        use super::*;

        #[test]
        fn empty_detection() {
            assert!(DetailFields::default().is_empty());

            let fields = DetailFields {
                sender: Some("Polisen Skåne".to_string()),
                ..DetailFields::default()
            };
            assert!(!fields.is_empty());
        }
    }

    mod enriched_event {
        use super::*;

        #[test]
        fn headline_trims_and_rejects_blank() {
            let event = sample_event(1);
            assert_eq!(
                event.headline(),
                Some("12 januari 22.16, Mordbrand, Helsingborg")
            );

            let blank = EnrichedEvent::new(
                2,
                "   ",
                ts("2024-01-12 23:00:00 +01:00"),
                ts("2024-01-12 23:00:00 +01:00"),
            );
            assert!(blank.headline().is_none());
        }

        #[test]
        fn serde_round_trip() {
            let event = sample_event(1)
                .with_event_type("Mordbrand")
                .with_location_name("Helsingborg")
                .with_url("https://polisen.se/handelse/1/")
                .with_details(DetailFields {
                    subtitle: Some("Brand i flerfamiljshus".to_string()),
                    ..DetailFields::default()
                });

            let json = serde_json::to_string(&event).unwrap();
            let parsed: EnrichedEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(event, parsed);
        }

        #[test]
        fn event_type_serializes_as_type() {
            let event = sample_event(1).with_event_type("Mordbrand");
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], "Mordbrand");
        }
    }

    mod bucket {
        use super::*;

        #[test]
        fn latest_is_first_event() {
            let events = vec![sample_event(1), sample_event(2)];
            let bucket = AreaBucket::new("Helsingborg", 5, events);

            assert_eq!(bucket.count, 5);
            assert_eq!(bucket.latest.as_ref().map(|e| e.id), Some(1));
            assert_eq!(bucket.events.len(), 2);
        }

        #[test]
        fn empty_bucket() {
            let bucket = AreaBucket::empty("Lund");
            assert_eq!(bucket.count, 0);
            assert!(bucket.latest.is_none());
            assert!(bucket.events.is_empty());
        }
    }

    mod snapshot {
        use super::*;

        #[test]
        fn insert_and_lookup() {
            let mut snapshot = Snapshot::new(Utc::now());
            assert!(snapshot.is_empty());

            snapshot.insert(AreaBucket::empty("Malmö"));
            snapshot.insert(AreaBucket::new("Lund", 1, vec![sample_event(1)]));

            assert_eq!(snapshot.len(), 2);
            assert!(snapshot.bucket("Malmö").is_some());
            assert_eq!(snapshot.bucket("Lund").unwrap().count, 1);
            assert!(snapshot.bucket("Ystad").is_none());
        }

        #[test]
        fn insert_replaces_same_area() {
            let mut snapshot = Snapshot::new(Utc::now());
            snapshot.insert(AreaBucket::empty("Malmö"));
            snapshot.insert(AreaBucket::new("Malmö", 3, vec![sample_event(1)]));

            assert_eq!(snapshot.len(), 1);
            assert_eq!(snapshot.bucket("Malmö").unwrap().count, 3);
        }
    }
}
