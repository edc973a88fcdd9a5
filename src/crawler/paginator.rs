//! Listing paginator
//!
//! Walks `seed?page=N&per_page=M` for N = 1.. until the listing selector
//! matches nothing on a page, a request fails, or the page ceiling is
//! reached. A page whose matches are all filtered out (not item links,
//! blank names) still continues the walk. One
//! [`Paginator`] serves both the series and the author layout; only the
//! selector and page size differ.

use crate::config::{CatalogConfig, ListingLayout};
use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::parser::{extract_candidates, parse_selector, ListingCandidate, ListingPage};
use crate::url::listing_page_url;
use crate::ScoutError;
use reqwest::Client;
use scraper::Selector;
use url::Url;

/// Why a listing walk stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStop {
    /// The listing selector matched nothing on this page
    EmptyPage(u32),

    /// The listing request for this page did not succeed
    RequestFailed { page: u32, reason: String },

    /// The configured page ceiling was reached
    Ceiling(u32),
}

/// Discovers item candidates from a paginated listing
#[derive(Clone)]
pub struct Paginator {
    client: Client,
    selector: Selector,
    page_size: u32,
    max_pages: u32,
    item_marker: String,
}

impl Paginator {
    /// Creates a paginator for one listing layout
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::Selector`] when the layout selector is invalid.
    pub fn new(
        client: Client,
        layout: &ListingLayout,
        catalog: &CatalogConfig,
        max_pages: u32,
    ) -> Result<Self, ScoutError> {
        Ok(Self {
            client,
            selector: parse_selector(&layout.selector)?,
            page_size: layout.page_size,
            max_pages,
            item_marker: catalog.item_path_marker.clone(),
        })
    }

    /// Starts a fresh walk from page 1
    pub fn walk<'a>(&'a self, seed_url: &'a str) -> ListingWalk<'a> {
        ListingWalk {
            paginator: self,
            seed_url,
            next_page: 1,
            stopped: None,
        }
    }

    /// Walks the whole listing and returns every candidate in discovery order
    ///
    /// A failed request ends the walk; the candidates gathered so far are
    /// returned, not an error.
    pub async fn paginate(&self, seed_url: &str) -> Vec<ListingCandidate> {
        let mut walk = self.walk(seed_url);
        let mut candidates = Vec::new();

        while let Some((_, page)) = walk.next_page().await {
            candidates.extend(page);
        }

        candidates
    }

    async fn fetch_page(&self, seed_url: &str, page: u32) -> Result<ListingPage, PageStop> {
        let page_url = listing_page_url(seed_url, page, self.page_size).map_err(|e| {
            PageStop::RequestFailed {
                page,
                reason: e.to_string(),
            }
        })?;

        match fetch_url(&self.client, page_url.as_str()).await {
            FetchResult::Success {
                final_url, body, ..
            } => {
                let base = Url::parse(&final_url).unwrap_or(page_url);
                Ok(extract_candidates(
                    &body,
                    &self.selector,
                    &base,
                    &self.item_marker,
                ))
            }
            FetchResult::HttpError { status_code } => Err(PageStop::RequestFailed {
                page,
                reason: format!("HTTP {}", status_code),
            }),
            FetchResult::NetworkError { error, .. } => {
                Err(PageStop::RequestFailed { page, reason: error })
            }
        }
    }
}

/// A single, non-restartable walk over a listing
///
/// Each call to [`ListingWalk::next_page`] requests one page; the walk ends
/// for good at the first stop condition.
pub struct ListingWalk<'a> {
    paginator: &'a Paginator,
    seed_url: &'a str,
    next_page: u32,
    stopped: Option<PageStop>,
}

impl ListingWalk<'_> {
    /// Fetches the next page, returning its number and candidates
    pub async fn next_page(&mut self) -> Option<(u32, Vec<ListingCandidate>)> {
        if self.stopped.is_some() {
            return None;
        }

        let page = self.next_page;
        if page > self.paginator.max_pages {
            tracing::info!("Reached page ceiling at page {}", self.paginator.max_pages);
            self.stopped = Some(PageStop::Ceiling(self.paginator.max_pages));
            return None;
        }

        match self.paginator.fetch_page(self.seed_url, page).await {
            Ok(listing) if listing.matched == 0 => {
                tracing::info!("Stopping at page #{}: no listing entries", page);
                self.stopped = Some(PageStop::EmptyPage(page));
                None
            }
            Ok(listing) => {
                tracing::info!(
                    "Page #{}: {} candidates of {} entries",
                    page,
                    listing.candidates.len(),
                    listing.matched
                );
                self.next_page += 1;
                Some((page, listing.candidates))
            }
            Err(stop) => {
                tracing::info!("Stopping at page #{}: {:?}", page, stop);
                self.stopped = Some(stop);
                None
            }
        }
    }

    /// Why the walk ended, once it has
    pub fn stop_reason(&self) -> Option<&PageStop> {
        self.stopped.as_ref()
    }

    /// Number of pages walked past so far
    pub fn pages_walked(&self) -> u32 {
        self.next_page - 1
    }
}
