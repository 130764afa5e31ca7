//! Pattern extraction of structured fields from event detail pages.
//!
//! Detail pages on polisen.se are server-rendered HTML. Extraction is
//! deliberately pattern-based and field-independent, so markup drift
//! degrades one field at a time instead of the whole page. Everything in
//! here is pure text-to-text; fetching lives in [`crate::details`].

use std::sync::LazyLock;

use chrono::DateTime;
use regex::{Captures, Regex};

use polisradar_core::{DetailFields, parse_feed_timestamp};

/// Lead paragraph ("preamble") of a detail page.
static PREAMBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(?:p|div)[^>]*class="[^"]*preamble[^"]*"[^>]*>(.*?)</(?:p|div)>"#)
        .expect("valid preamble regex")
});

/// Editorial body container.
static BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*(?:editorial-html|text-body)[^"]*"[^>]*>(.*?)</div>"#)
        .expect("valid body regex")
});

/// Byline/sender block, typically the publishing police region.
static BYLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(?:p|span|div)[^>]*class="[^"]*(?:byline|author|sender)[^"]*"[^>]*>(.*?)</(?:p|span|div)>"#)
        .expect("valid byline regex")
});

/// `<time datetime="...">display</time>` published marker.
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<time[^>]*\bdatetime="([^"]+)"[^>]*>(.*?)</time>"#)
        .expect("valid time regex")
});

/// Plain-text "Publicerad ..." fallback for the display string.
static PUBLISHED_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)publicerad[\s:]+([^<\r\n]+)").expect("valid published text regex")
});

static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid br regex"));

static PARA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?p[^>]*>").expect("valid paragraph regex"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));

static MULTI_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#([0-9]+|[xX][0-9a-fA-F]+);").expect("valid entity regex"));

/// Extracts structured fields from detail-page HTML.
///
/// Each field is pulled independently; a page missing one marker still
/// yields the others. The machine-readable published timestamp accepts
/// both RFC 3339 and the feed's own timestamp format.
pub fn extract_detail_fields(html: &str) -> DetailFields {
    let subtitle = PREAMBLE_RE
        .captures(html)
        .map(|caps| html_to_text(&caps[1]))
        .filter(|text| !text.is_empty());

    let body = BODY_RE
        .captures(html)
        .map(|caps| html_to_text(&caps[1]))
        .filter(|text| !text.is_empty());

    let sender = BYLINE_RE
        .captures(html)
        .map(|caps| clean_inline(&html_to_text(&caps[1])))
        .filter(|text| !text.is_empty());

    let (published_iso, time_display) = match TIME_RE.captures(html) {
        Some(caps) => {
            let iso = parse_published_timestamp(&caps[1]);
            let display = clean_inline(&html_to_text(&caps[2]));
            (iso, (!display.is_empty()).then_some(display))
        }
        None => (None, None),
    };

    let published_display = time_display.or_else(|| {
        PUBLISHED_TEXT_RE
            .captures(html)
            .map(|caps| clean_inline(&unescape_entities(&caps[1])))
            .filter(|text| !text.is_empty())
    });

    DetailFields {
        subtitle,
        body,
        sender,
        published_display,
        published_iso,
    }
}

fn parse_published_timestamp(text: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .ok()
        .or_else(|| parse_feed_timestamp(text))
}

/// Reduces an HTML fragment to readable plain text.
///
/// `<br>` becomes a newline, paragraph boundaries become blank lines, all
/// other tags are stripped, entities are unescaped and runs of three or
/// more newlines collapse to two.
pub fn html_to_text(html: &str) -> String {
    let text = html.replace('\r', "");
    let text = BR_RE.replace_all(&text, "\n");
    let text = PARA_RE.replace_all(&text, "\n\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = unescape_entities(&text);

    // Trim per line first so indentation does not hide newline runs.
    let text = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    MULTI_NEWLINE_RE
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}

/// Unescapes the HTML entities that occur on detail pages: the common
/// named ones plus numeric character references.
pub fn unescape_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY_RE.replace_all(text, |caps: &Captures<'_>| {
        let code = &caps[1];
        let value = if let Some(hex) = code.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()
        } else {
            code.parse::<u32>().ok()
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    // Named entities seen on these pages: the HTML basics plus the
    // Swedish letters.
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&aring;", "å")
        .replace("&auml;", "ä")
        .replace("&ouml;", "ö")
        .replace("&Aring;", "Å")
        .replace("&Auml;", "Ä")
        .replace("&Ouml;", "Ö")
        .replace("&eacute;", "é")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Collapses all whitespace runs into single spaces.
fn clean_inline(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <article>
          <h1>12 januari 22.16, Mordbrand, Helsingborg</h1>
          <p class="preamble">Brand i flerfamiljshus p&aring; Drottninggatan.</p>
          <p class="textpage-published">Publicerad
            <time datetime="2024-01-12T23:00:00+01:00">12 januari 2024 23:00</time>
          </p>
          <div class="text-body editorial-html">
            <p>Larm om brand inkom vid 22-tiden.</p>
            <p>R&auml;ddningstj&auml;nsten sl&auml;ckte branden.<br>Ingen person skadades.</p>
          </div>
          <span class="byline">Polisen Sk&aring;ne</span>
        </article>
        </body></html>
    "#;

    mod field_extraction {
        use super::*;

        #[test]
        fn extracts_every_field() {
            let fields = extract_detail_fields(PAGE);

            assert_eq!(
                fields.subtitle.as_deref(),
                Some("Brand i flerfamiljshus på Drottninggatan.")
            );
            assert_eq!(
                fields.body.as_deref(),
                Some(
                    "Larm om brand inkom vid 22-tiden.\n\nRäddningstjänsten släckte branden.\nIngen person skadades."
                )
            );
            assert_eq!(fields.sender.as_deref(), Some("Polisen Skåne"));
            assert_eq!(
                fields.published_display.as_deref(),
                Some("12 januari 2024 23:00")
            );
            let iso = fields.published_iso.unwrap();
            assert_eq!(
                iso.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
                "2024-01-12 23:00:00 +01:00"
            );
        }

        #[test]
        fn fields_are_independent() {
            let html = r#"<span class="byline">Polisen Region Syd</span>"#;
            let fields = extract_detail_fields(html);

            assert_eq!(fields.sender.as_deref(), Some("Polisen Region Syd"));
            assert!(fields.subtitle.is_none());
            assert!(fields.body.is_none());
            assert!(fields.published_iso.is_none());
        }

        #[test]
        fn published_text_fallback_without_time_tag() {
            let html = "<p>Publicerad 12 januari 2024 23:00</p>";
            let fields = extract_detail_fields(html);

            assert_eq!(
                fields.published_display.as_deref(),
                Some("12 januari 2024 23:00")
            );
            assert!(fields.published_iso.is_none());
        }

        #[test]
        fn feed_format_time_attribute_is_accepted() {
            let html = r#"<time datetime="2024-01-12 23:00:00 +01:00">igår</time>"#;
            let fields = extract_detail_fields(html);
            assert!(fields.published_iso.is_some());
        }

        #[test]
        fn unrecognizable_page_yields_nothing() {
            let fields = extract_detail_fields("<html><body><h1>404</h1></body></html>");
            assert!(fields.is_empty());
        }
    }

    mod text_cleanup {
        use super::*;

        #[test]
        fn br_becomes_newline() {
            assert_eq!(html_to_text("a<br>b<br/>c<BR >d"), "a\nb\nc\nd");
        }

        #[test]
        fn paragraphs_become_blank_lines() {
            assert_eq!(html_to_text("<p>one</p><p>two</p>"), "one\n\ntwo");
        }

        #[test]
        fn tags_are_stripped() {
            assert_eq!(html_to_text("<em>bold</em> <a href=\"x\">link</a>"), "bold link");
        }

        #[test]
        fn newline_runs_collapse_to_two() {
            assert_eq!(html_to_text("a<p></p><p></p><p>b</p>"), "a\n\nb");
        }

        #[test]
        fn entities_unescape() {
            assert_eq!(unescape_entities("sl&auml;ckte"), "sl\u{e4}ckte");
            assert_eq!(unescape_entities("&lt;tag&gt; &amp; &quot;x&quot;"), "<tag> & \"x\"");
            assert_eq!(unescape_entities("&#65;&#x42;"), "AB");
            assert_eq!(unescape_entities("a&nbsp;b"), "a b");
        }

        #[test]
        fn numeric_entity_for_swedish_letters() {
            assert_eq!(unescape_entities("Sk&#229;ne"), "Skåne");
        }
    }
}
