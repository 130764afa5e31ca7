//! HTTP client for the polisen.se events API.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use url::Url;

use polisradar_core::RawEvent;

use crate::error::{FeedError, FeedResult};
use crate::source::{BoxFuture, EventSource};

/// The public events endpoint.
pub const EVENTS_URL: &str = "https://polisen.se/api/events";

/// Origin that root-relative event URLs resolve against.
pub const FEED_ORIGIN: &str = "https://polisen.se";

/// Timeout for one list fetch.
pub(crate) const LIST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for one detail-page fetch.
pub(crate) const DETAIL_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the events feed.
#[derive(Debug, Clone)]
pub struct PolisenClient {
    http: reqwest::Client,
    events_url: String,
    origin: String,
}

impl PolisenClient {
    /// Creates a client against the public endpoints.
    pub fn new() -> Self {
        Self::with_endpoints(EVENTS_URL, FEED_ORIGIN)
    }

    /// Creates a client against custom endpoints.
    pub fn with_endpoints(events_url: impl Into<String>, origin: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("polisradar/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            events_url: events_url.into(),
            origin: origin.into(),
        }
    }

    /// Returns the feed origin used for URL resolution.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetches the current events, optionally scoped server-side to an area.
    ///
    /// The payload must be a JSON array; elements that do not deserialize
    /// as events are skipped without logging.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` on transport failures, non-success statuses or a
    /// payload that is not a JSON array.
    pub async fn list_events(&self, area: Option<&str>) -> FeedResult<Vec<RawEvent>> {
        let area = area.map(str::trim).filter(|a| !a.is_empty());

        let mut request = self.http.get(&self.events_url).timeout(LIST_TIMEOUT);
        if let Some(area) = area {
            request = request.query(&[("locationname", area)]);
        }

        let response = request.send().await.map_err(FeedError::transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::status(format!(
                "events endpoint returned HTTP {status}"
            )));
        }

        let body = response.text().await.map_err(FeedError::transport)?;
        let events = parse_event_list(&body)?;
        debug!(
            count = events.len(),
            area = area.unwrap_or("<all>"),
            "fetched events"
        );
        Ok(events)
    }
}

impl Default for PolisenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for PolisenClient {
    fn fetch_events<'a>(
        &'a self,
        area: Option<&'a str>,
    ) -> BoxFuture<'a, FeedResult<Vec<RawEvent>>> {
        Box::pin(self.list_events(area))
    }
}

/// Parses an events payload.
///
/// The payload as a whole must be a JSON array; individual elements that do
/// not deserialize as events are silently dropped.
pub fn parse_event_list(body: &str) -> FeedResult<Vec<RawEvent>> {
    let values: Vec<Value> = serde_json::from_str(body).map_err(|e| {
        FeedError::invalid_response("events payload is not a JSON array").with_source(e)
    })?;

    Ok(values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawEvent>(value).ok())
        .collect())
}

/// Resolves an event URL against the feed origin.
///
/// Absolute URLs pass through unchanged; relative URLs are joined onto the
/// origin; unparseable input resolves to `None`.
pub fn resolve_event_url(origin: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    let base = Url::parse(origin).ok()?;
    base.join(raw).ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod payload_parsing {
        use super::*;
        use crate::error::FeedErrorCode;

        #[test]
        fn parses_well_formed_events() {
            let body = r#"[
                {
                    "id": 1,
                    "datetime": "2024-01-12 23:00:00 +01:00",
                    "name": "12 januari 22.16, Mordbrand, Helsingborg",
                    "summary": "Mordbrand",
                    "type": "Mordbrand",
                    "url": "/aktuellt/handelser/1/",
                    "location": {"name": "Helsingborg", "gps": "56.04,12.69"}
                },
                {
                    "id": 2,
                    "datetime": "2024-01-12 21:10:00 +01:00",
                    "name": "12 januari 20.55, Stöld, Lund",
                    "type": "Stöld",
                    "url": "/aktuellt/handelser/2/",
                    "location": {"name": "Lund"}
                }
            ]"#;

            let events = parse_event_list(body).unwrap();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].id, 1);
            assert_eq!(events[1].location_name(), "Lund");
        }

        #[test]
        fn skips_malformed_elements_silently() {
            let body = r#"[
                {"id": 1, "name": "ok"},
                "not an object",
                {"name": "missing id"},
                {"id": "not an integer"},
                {"id": 2}
            ]"#;

            let events = parse_event_list(body).unwrap();
            let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
            assert_eq!(ids, vec![1, 2]);
        }

        #[test]
        fn rejects_non_array_payload() {
            let err = parse_event_list(r#"{"events": []}"#).unwrap_err();
            assert_eq!(err.code(), FeedErrorCode::InvalidResponse);

            let err = parse_event_list("not json at all").unwrap_err();
            assert_eq!(err.code(), FeedErrorCode::InvalidResponse);
        }

        #[test]
        fn empty_array_is_fine() {
            assert!(parse_event_list("[]").unwrap().is_empty());
        }
    }

    mod url_resolution {
        use super::*;

        #[test]
        fn absolute_passes_through() {
            assert_eq!(
                resolve_event_url(FEED_ORIGIN, "https://polisen.se/handelse/1/"),
                Some("https://polisen.se/handelse/1/".to_string())
            );
        }

        #[test]
        fn root_relative_joins_origin() {
            assert_eq!(
                resolve_event_url(FEED_ORIGIN, "/aktuellt/handelser/1/"),
                Some("https://polisen.se/aktuellt/handelser/1/".to_string())
            );
        }

        #[test]
        fn empty_is_none() {
            assert_eq!(resolve_event_url(FEED_ORIGIN, ""), None);
            assert_eq!(resolve_event_url(FEED_ORIGIN, "   "), None);
        }

        #[test]
        fn bad_origin_is_none() {
            assert_eq!(resolve_event_url("not a url", "/x/"), None);
        }
    }
}
