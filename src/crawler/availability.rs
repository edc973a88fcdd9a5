//! Availability checker
//!
//! Queries the three retail sources for one item. Every lookup is
//! best-effort: a failed request or unexpected markup counts as "not in
//! stock" for that source only, and never fails the item.
//!
//! | Source | Keyed by | In stock when |
//! |--------|----------|---------------|
//! | Bookchor | each ISBN | some `.pi-price` is not "Out of Stock" |
//! | Bookish Santa | item name | a `.productitem--title` equals the name and its card is not sold out |
//! | SHBI | item name | `.search-results-count` does not start with "0 result(s)" |

use crate::config::SourcesConfig;
use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::parser::element_text;
use crate::item::Availability;
use crate::url::fill_template;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

/// Result-count text SHBI shows for an empty search
const SHBI_NO_RESULTS: &str = "0 result(s)";

/// Bookchor lookups in flight at once for a single item
pub const BOOKCHOR_LOOKUPS_IN_FLIGHT: usize = 2;

const OUT_OF_STOCK: &str = "out of stock";
const SOLD_OUT: &str = "sold out";

/// Checks item availability across the retail sources
#[derive(Clone)]
pub struct AvailabilityChecker {
    client: Client,
    sources: SourcesConfig,
}

impl AvailabilityChecker {
    pub fn new(client: Client, sources: &SourcesConfig) -> Self {
        Self {
            client,
            sources: sources.clone(),
        }
    }

    /// Runs all three sources concurrently
    pub async fn check_all(&self, name: &str, identifiers: &BTreeSet<String>) -> Availability {
        let (bookchor, bookish_santa, shbi) = tokio::join!(
            self.check_bookchor(identifiers),
            self.check_bookish_santa(name),
            self.check_shbi(name),
        );

        tracing::debug!(
            "{}: #ISBNs {} Bookchor: {} BookishSanta: {} SHBI: {}",
            name,
            identifiers.len(),
            bookchor.len(),
            bookish_santa,
            shbi
        );

        Availability {
            bookchor,
            bookish_santa,
            shbi,
        }
    }

    /// Returns the ISBNs Bookchor has in stock, in identifier order
    ///
    /// At most [`BOOKCHOR_LOOKUPS_IN_FLIGHT`] searches run at once.
    pub async fn check_bookchor(&self, identifiers: &BTreeSet<String>) -> Vec<String> {
        let lookups: Vec<_> = identifiers
            .iter()
            .map(|isbn| self.bookchor_lookup(isbn))
            .collect();
        stream::iter(lookups)
            .buffered(BOOKCHOR_LOOKUPS_IN_FLIGHT)
            .filter_map(|hit| async move { hit })
            .collect()
            .await
    }

    /// One Bookchor search; `Some(isbn)` when in stock
    async fn bookchor_lookup(&self, isbn: &String) -> Option<String> {
        let in_stock = self
            .search(&self.sources.bookchor_url, isbn)
            .await
            .is_some_and(|html| bookchor_in_stock(&html));
        in_stock.then(|| isbn.clone())
    }

    pub async fn check_bookish_santa(&self, name: &str) -> bool {
        self.search(&self.sources.bookish_santa_url, name)
            .await
            .is_some_and(|html| bookish_santa_in_stock(&html, name))
    }

    pub async fn check_shbi(&self, name: &str) -> bool {
        self.search(&self.sources.shbi_url, name)
            .await
            .is_some_and(|html| shbi_has_results(&html))
    }

    /// Issues one search request; any failure degrades to `None`
    async fn search(&self, template: &str, query: &str) -> Option<String> {
        let url = match fill_template(template, query) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot build search URL for '{}': {}", query, e);
                return None;
            }
        };

        match fetch_url(&self.client, &url).await {
            FetchResult::Success { body, .. } => Some(body),
            FetchResult::HttpError { status_code } => {
                tracing::warn!("{} answered HTTP {}; treating as not in stock", url, status_code);
                None
            }
            FetchResult::NetworkError { error, .. } => {
                tracing::warn!("{} failed ({}); treating as not in stock", url, error);
                None
            }
        }
    }
}

/// True when some price tag on a Bookchor result page is not "Out of Stock"
pub fn bookchor_in_stock(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(price_selector) = Selector::parse(".pi-price") else {
        return false;
    };

    document
        .select(&price_selector)
        .any(|price| !element_text(&price).eq_ignore_ascii_case(OUT_OF_STOCK))
}

/// True when a Bookish Santa product title equals `name` (case-insensitive)
/// and the product card is not marked sold out
pub fn bookish_santa_in_stock(html: &str, name: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(title_selector) = Selector::parse(".productitem--title") else {
        return false;
    };
    let wanted = name.trim().to_lowercase();

    document.select(&title_selector).any(|title| {
        element_text(&title).to_lowercase() == wanted
            && !product_card(title)
                .map(|card| element_text(&card).to_lowercase().contains(SOLD_OUT))
                .unwrap_or(false)
    })
}

/// True when the SHBI result counter reports at least one result
pub fn shbi_has_results(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(count_selector) = Selector::parse(".search-results-count") else {
        return false;
    };

    document
        .select(&count_selector)
        .any(|count| !element_text(&count).starts_with(SHBI_NO_RESULTS))
}

/// The card holding a product title: its grandparent element
fn product_card(title: ElementRef<'_>) -> Option<ElementRef<'_>> {
    title
        .parent()
        .and_then(|parent| parent.parent())
        .and_then(ElementRef::wrap)
}
