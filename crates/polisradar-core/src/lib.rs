//! Core types: events, time parsing, area matching, tracing

pub mod area;
pub mod event;
pub mod time;
pub mod tracing;

pub use area::{MatchMode, UnknownMatchMode, area_matches, dedupe_areas, split_areas};
pub use event::{AreaBucket, DetailFields, EnrichedEvent, RawEvent, RawLocation, Snapshot};
pub use time::{DayGroup, day_group, parse_event_time_from_title, parse_feed_timestamp};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
