//! Location-name suggestions for configuration surfaces.
//!
//! polisen.se exposes its full municipality/county list as a `<datalist>`
//! on the news list page. The catalog scrapes that list and caches it for
//! twelve hours; the county names are a fixed floor and the live feed's
//! location names fill in whenever the markup changes under us.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::PolisenClient;
use crate::error::{FeedError, FeedResult};
use crate::scrape::unescape_entities;

/// The page carrying the location `<datalist>`.
pub const LIST_PAGE_URL: &str = "https://polisen.se/aktuellt/polisens-nyheter/1/";

/// Timeout for one list-page scrape.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(20);

/// Lifetime of a cached suggestion list.
pub const SUGGESTIONS_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// The Swedish county names; always part of the suggestions.
pub const COUNTY_LOCATIONS: [&str; 21] = [
    "Blekinge län",
    "Dalarnas län",
    "Gotlands län",
    "Gävleborgs län",
    "Hallands län",
    "Jämtlands län",
    "Jönköpings län",
    "Kalmar län",
    "Kronobergs län",
    "Norrbottens län",
    "Skåne län",
    "Stockholms län",
    "Södermanlands län",
    "Uppsala län",
    "Värmlands län",
    "Västerbottens län",
    "Västernorrlands län",
    "Västmanlands län",
    "Västra Götalands län",
    "Örebro län",
    "Östergötlands län",
];

static DATALIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<datalist[^>]*\bid="datalist-[^"]*"[^>]*>(.*?)</datalist>"#)
        .expect("valid datalist regex")
});

static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<option[^>]*\bvalue="([^"]*)""#).expect("valid option regex")
});

/// Extracts option values from the location `<datalist>` blocks of a page.
pub fn extract_datalist_values(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();

    for datalist in DATALIST_RE.captures_iter(html) {
        for option in OPTION_RE.captures_iter(&datalist[1]) {
            let value = unescape_entities(&option[1]).trim().to_string();
            if !value.is_empty() && seen.insert(value.to_lowercase()) {
                values.push(value);
            }
        }
    }

    values
}

#[derive(Debug)]
struct CachedSuggestions {
    values: Vec<String>,
    fetched_at: Instant,
}

/// Per-process cache of location-name suggestions.
#[derive(Debug)]
pub struct LocationCatalog {
    client: PolisenClient,
    list_page_url: String,
    ttl: Duration,
    cache: Mutex<Option<CachedSuggestions>>,
}

impl LocationCatalog {
    /// Creates a catalog against the public list page.
    pub fn new(client: PolisenClient) -> Self {
        Self::with_list_page(client, LIST_PAGE_URL)
    }

    /// Creates a catalog against a custom list page.
    pub fn with_list_page(client: PolisenClient, list_page_url: impl Into<String>) -> Self {
        Self {
            client,
            list_page_url: list_page_url.into(),
            ttl: SUGGESTIONS_TTL,
            cache: Mutex::new(None),
        }
    }

    /// Returns the current suggestions, sorted casefolded.
    ///
    /// Best-effort: scraping and feed failures are debug-logged and the
    /// county floor is always present. The result is cached for
    /// [`SUGGESTIONS_TTL`].
    pub async fn suggestions(&self) -> Vec<String> {
        {
            let cache = self.cache.lock().await;
            if let Some(ref cached) = *cache
                && cached.fetched_at.elapsed() < self.ttl
            {
                return cached.values.clone();
            }
        }

        fn push_unique(value: String, seen: &mut HashSet<String>, values: &mut Vec<String>) {
            if seen.insert(value.to_lowercase()) {
                values.push(value);
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut values: Vec<String> = Vec::new();

        for county in COUNTY_LOCATIONS {
            push_unique(county.to_string(), &mut seen, &mut values);
        }

        match self.scrape_list_page().await {
            Ok(scraped) => {
                for value in scraped {
                    push_unique(value, &mut seen, &mut values);
                }
            }
            Err(e) => debug!(error = %e, "failed to scrape location datalist"),
        }

        // The live feed also names locations; include them so the list
        // survives markup changes on the list page.
        match self.client.list_events(None).await {
            Ok(events) => {
                for event in events {
                    let name = event.location_name().trim();
                    if !name.is_empty() {
                        push_unique(name.to_string(), &mut seen, &mut values);
                    }
                }
            }
            Err(e) => debug!(error = %e, "failed to build location suggestions from feed"),
        }

        values.sort_by_key(|value| value.to_lowercase());

        let mut cache = self.cache.lock().await;
        *cache = Some(CachedSuggestions {
            values: values.clone(),
            fetched_at: Instant::now(),
        });
        values
    }

    async fn scrape_list_page(&self) -> FeedResult<Vec<String>> {
        let response = self
            .client
            .http()
            .get(&self.list_page_url)
            .timeout(SCRAPE_TIMEOUT)
            .send()
            .await
            .map_err(FeedError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::status(format!(
                "list page returned HTTP {status}"
            )));
        }

        let html = response.text().await.map_err(FeedError::transport)?;
        Ok(extract_datalist_values(&html))
    }
}
