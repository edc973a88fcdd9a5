//! HTML parser for catalog pages
//!
//! This module extracts from catalog HTML:
//! - Listing candidates (name + absolute href) matched by a CSS selector
//! - The editions link of an item page
//! - The page title
//! - ISBN-13 identifiers of an editions page

use crate::url::resolve_href;
use crate::ScoutError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use url::Url;

/// One item discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCandidate {
    /// Anchor text, whitespace collapsed
    pub name: String,

    /// Absolute item URL
    pub href: String,
}

/// Candidates of one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Elements the listing selector matched, before any filtering
    pub matched: usize,

    pub candidates: Vec<ListingCandidate>,
}

/// Parses a CSS selector, mapping failures into [`ScoutError::Selector`]
pub fn parse_selector(selector: &str) -> Result<Selector, ScoutError> {
    Selector::parse(selector).map_err(|e| ScoutError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Extracts listing candidates in document order
///
/// # Extraction Rules
///
/// - Only elements matched by `selector` that carry an `href` are considered
/// - The href must contain `item_marker` (e.g. `/book/show`)
/// - Relative hrefs are resolved against `base`
/// - Anchors with empty text are skipped
///
/// # Example
///
/// ```
/// use edition_scout::crawler::{extract_candidates, parse_selector};
/// use url::Url;
///
/// let html = r#"<a class="bookTitle" href="/book/show/1.Dune">Dune</a>"#;
/// let selector = parse_selector("a.bookTitle").unwrap();
/// let base = Url::parse("https://example.com/").unwrap();
/// let page = extract_candidates(html, &selector, &base, "/book/show");
/// assert_eq!(page.matched, 1);
/// assert_eq!(page.candidates[0].href, "https://example.com/book/show/1.Dune");
/// ```
pub fn extract_candidates(
    html: &str,
    selector: &Selector,
    base: &Url,
    item_marker: &str,
) -> ListingPage {
    let document = Html::parse_document(html);
    let mut matched = 0;

    let candidates = document
        .select(selector)
        .inspect(|_| matched += 1)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            if !href.contains(item_marker) {
                return None;
            }

            let name = element_text(&element);
            if name.is_empty() {
                return None;
            }

            let href = resolve_href(href, base)?;
            Some(ListingCandidate { name, href })
        })
        .collect();

    ListingPage {
        matched,
        candidates,
    }
}

/// Finds the absolute URL of the anchor whose text equals `marker`
///
/// Matching is case-insensitive on whitespace-collapsed text. Returns None
/// when the page has no such anchor.
pub fn find_marker_link(html: &str, marker: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]").ok()?;
    let marker = marker.trim().to_lowercase();

    document
        .select(&anchor_selector)
        .filter(|element| element_text(element).to_lowercase() == marker)
        .find_map(|element| {
            element
                .value()
                .attr("href")
                .and_then(|href| resolve_href(href, base))
        })
}

/// Extracts the page title from the HTML document
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element_text(&element))
        .filter(|s| !s.is_empty())
}

/// Extracts every `ISBN13: <13 digits>` occurrence of a page
///
/// Runs over the raw markup, so identifiers split across tags are not
/// matched. Duplicates collapse.
pub fn extract_isbn13(text: &str) -> BTreeSet<String> {
    static ISBN13: OnceLock<Regex> = OnceLock::new();
    let pattern =
        ISBN13.get_or_init(|| Regex::new(r"ISBN13:\s*(\d{13})\b").expect("static ISBN13 pattern"));

    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Collects an element's text with whitespace collapsed
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
