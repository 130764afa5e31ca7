//! Upstream access: the polisen.se events API, detail-page scraping,
//! bounded-concurrency enrichment and location suggestions.

pub mod client;
pub mod details;
pub mod error;
pub mod locations;
pub mod scrape;
pub mod source;

pub use client::{EVENTS_URL, FEED_ORIGIN, PolisenClient, parse_event_list, resolve_event_url};
pub use details::{
    DETAILS_TTL, DetailEnricher, DetailsCache, MAX_CONCURRENT_DETAIL_FETCHES,
};
pub use error::{FeedError, FeedErrorCode, FeedResult};
pub use locations::{COUNTY_LOCATIONS, LocationCatalog, extract_datalist_values};
pub use scrape::{extract_detail_fields, html_to_text, unescape_entities};
pub use source::{BoxFuture, DetailSource, EventSource};
