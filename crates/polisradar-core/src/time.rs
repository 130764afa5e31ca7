//! Timestamp parsing for the events feed.
//!
//! Two time formats appear in the wild:
//! - the feed's `datetime` field, `YYYY-MM-DD HH:MM:SS +01:00`, which says
//!   when an event was published or last updated;
//! - a free-text `"<day> <month> <hh>.<mm>"` fragment (Swedish month names)
//!   at the start of many event titles, which is the closest thing the feed
//!   has to the actual occurrence time.
//!
//! [`parse_feed_timestamp`] handles the former, [`parse_event_time_from_title`]
//! the latter, and [`day_group`] buckets a publish time into today/yesterday/
//! earlier for ranking.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Leading `"12 januari 22.16"` fragment in event titles.
static TITLE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2})\s+(\p{L}+)\s+(\d{1,2})\.(\d{2})").expect("valid title time regex")
});

/// Swedish month names as they appear in event titles, in calendar order.
const SWEDISH_MONTHS: [&str; 12] = [
    "januari",
    "februari",
    "mars",
    "april",
    "maj",
    "juni",
    "juli",
    "augusti",
    "september",
    "oktober",
    "november",
    "december",
];

/// Maps a Swedish month name (any case) to its 1-based month number.
fn swedish_month(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    SWEDISH_MONTHS
        .iter()
        .position(|month| *month == name)
        .map(|index| index as u32 + 1)
}

/// Parses a feed timestamp of the form `YYYY-MM-DD HH:MM:SS +01:00`.
///
/// The supplied UTC offset is preserved as-is. A timestamp without an
/// offset cannot be windowed reliably and parses as `None`, as does empty
/// or otherwise malformed input.
pub fn parse_feed_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %:z")
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z"))
        .ok()
}

/// Best-effort occurrence time extracted from an event title.
///
/// Titles often lead with `"<day> <month> <hh>.<mm>"` (no year). The year
/// and UTC offset are borrowed from `fallback`, normally the event's
/// publish timestamp. Two corrections are applied, in this order:
///
/// 1. a parsed date more than 30 days after the fallback belongs to the
///    previous year (December events published in January);
/// 2. a result still more than 2 minutes after the fallback belongs to the
///    previous day (events published just after midnight).
///
/// On no match, an unrecognized month, or an invalid calendar date the
/// fallback is returned unchanged.
pub fn parse_event_time_from_title(
    title: &str,
    fallback: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    let Some(caps) = TITLE_TIME_RE.captures(title) else {
        return fallback;
    };

    let (Ok(day), Ok(hour), Ok(minute)) = (
        caps[1].parse::<u32>(),
        caps[3].parse::<u32>(),
        caps[4].parse::<u32>(),
    ) else {
        return fallback;
    };
    let Some(month) = swedish_month(&caps[2]) else {
        return fallback;
    };

    let offset = *fallback.offset();
    let Some(parsed) = local_datetime(offset, fallback.year(), month, day, hour, minute) else {
        return fallback;
    };

    // Year boundary: a "31 december" title published in early January.
    let mut parsed = parsed;
    if parsed - fallback > Duration::days(30) {
        let Some(previous_year) =
            local_datetime(offset, fallback.year() - 1, month, day, hour, minute)
        else {
            return fallback;
        };
        parsed = previous_year;
    }

    // Midnight boundary: an evening event published shortly after 00:00.
    if parsed - fallback > Duration::minutes(2) {
        parsed = parsed - Duration::days(1);
    }

    parsed
}

fn local_datetime(
    offset: FixedOffset,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    offset.from_local_datetime(&naive).single()
}

/// Day-relative priority of a publish timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayGroup {
    /// Published today.
    Today,
    /// Published yesterday.
    Yesterday,
    /// Published earlier, but still inside the window.
    Earlier,
}

/// Buckets `published` by its own-offset calendar day relative to `now`.
///
/// "Today" is computed by shifting `now` into the publish timestamp's
/// offset, so grouping does not depend on the host timezone.
pub fn day_group(published: DateTime<FixedOffset>, now: DateTime<Utc>) -> DayGroup {
    let today = now.with_timezone(published.offset()).date_naive();
    let day = published.date_naive();
    if day == today {
        DayGroup::Today
    } else if today.pred_opt().is_some_and(|yesterday| day == yesterday) {
        DayGroup::Yesterday
    } else {
        DayGroup::Earlier
    }
}
