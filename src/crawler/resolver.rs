//! Identifier resolver
//!
//! Item page → editions page → ISBN-13 set. Network failures are not retried
//! here; they surface as errors and fail the whole item.

use crate::config::CatalogConfig;
use crate::crawler::fetcher::fetch_url;
use crate::crawler::parser::{extract_isbn13, extract_title, find_marker_link};
use crate::ScoutError;
use reqwest::Client;
use std::collections::BTreeSet;
use url::Url;

/// What one fetch of an item page yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPage {
    /// Absolute editions URL, `None` when the marker anchor is missing
    pub editions_url: Option<String>,

    /// Raw `<title>` text of the item page
    pub title: Option<String>,
}

/// Resolves item pages to their editions and identifiers
#[derive(Clone)]
pub struct Resolver {
    client: Client,
    editions_marker: String,
}

impl Resolver {
    pub fn new(client: Client, catalog: &CatalogConfig) -> Self {
        Self {
            client,
            editions_marker: catalog.editions_marker.clone(),
        }
    }

    /// Fetches an item page and reads its editions link and title
    pub async fn inspect_item(&self, item_url: &str) -> Result<ItemPage, ScoutError> {
        let (final_url, body) = fetch_url(&self.client, item_url)
            .await
            .into_body(item_url)?;
        let base = Url::parse(&final_url)?;

        let editions_url = find_marker_link(&body, &self.editions_marker, &base);
        if editions_url.is_none() {
            tracing::info!("{}: no '{}' link", item_url, self.editions_marker);
        }

        Ok(ItemPage {
            editions_url,
            title: extract_title(&body),
        })
    }

    /// Returns the editions URL of an item, `None` when the page has no
    /// editions link
    pub async fn resolve_editions(&self, item_url: &str) -> Result<Option<String>, ScoutError> {
        Ok(self.inspect_item(item_url).await?.editions_url)
    }

    /// Fetches an editions page and collects its ISBN-13 identifiers
    pub async fn extract_identifiers(
        &self,
        editions_url: &str,
    ) -> Result<BTreeSet<String>, ScoutError> {
        let (_, body) = fetch_url(&self.client, editions_url)
            .await
            .into_body(editions_url)?;

        let identifiers = extract_isbn13(&body);
        tracing::debug!("{}: {} ISBNs", editions_url, identifiers.len());
        Ok(identifiers)
    }
}
