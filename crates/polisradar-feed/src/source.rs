//! Seams between the aggregator and the upstream site.
//!
//! The aggregator only talks to these two traits, so tests run against
//! stub sources and markup-format drift stays inside the implementations.

use std::future::Future;
use std::pin::Pin;

use polisradar_core::{DetailFields, RawEvent};

use crate::error::FeedResult;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of raw feed events.
pub trait EventSource: Send + Sync {
    /// Fetches the current event list, scoped server-side when `area` is
    /// non-empty and the upstream supports a location parameter.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` on network failures, non-success statuses or a
    /// payload that is not a JSON array.
    fn fetch_events<'a>(
        &'a self,
        area: Option<&'a str>,
    ) -> BoxFuture<'a, FeedResult<Vec<RawEvent>>>;
}

/// Source of scraped detail-page fields for a single event.
pub trait DetailSource: Send + Sync {
    /// Fetches and extracts detail fields for one event.
    ///
    /// Implementations are expected to bound their own concurrency and to
    /// cache by `event_id`; callers treat any error as "leave the event
    /// unenriched".
    fn fetch_details<'a>(
        &'a self,
        event_id: i64,
        url: &'a str,
    ) -> BoxFuture<'a, FeedResult<DetailFields>>;
}
