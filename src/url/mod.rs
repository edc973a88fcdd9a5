//! URL handling module for Edition-Scout
//!
//! This module builds listing page URLs, fills source search templates,
//! resolves relative hrefs against the page they were found on, and normalizes item URLs.

mod normalize;

pub use normalize::normalize_url;

use crate::{UrlError, UrlResult};
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Placeholder replaced by the search term in source URL templates
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Builds the URL of one listing page
///
/// Existing `page` / `per_page` parameters on the seed are replaced; any other
/// parameters are kept.
///
/// # Examples
///
/// ```
/// use edition_scout::url::listing_page_url;
///
/// let url = listing_page_url("https://example.com/series/42-dune", 3, 30).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/series/42-dune?page=3&per_page=30");
/// ```
pub fn listing_page_url(seed: &str, page: u32, per_page: u32) -> UrlResult<Url> {
    let mut url = Url::parse(seed.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page" && key != "per_page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &per_page.to_string());

    Ok(url)
}

/// Fills a search template with a percent-encoded query
///
/// # Examples
///
/// ```
/// use edition_scout::url::fill_template;
///
/// let url = fill_template("https://shop.example.com/search?q={query}", "Dune Messiah").unwrap();
/// assert_eq!(url, "https://shop.example.com/search?q=Dune+Messiah");
/// ```
pub fn fill_template(template: &str, query: &str) -> UrlResult<String> {
    if !template.contains(QUERY_PLACEHOLDER) {
        return Err(UrlError::MissingPlaceholder(template.to_string()));
    }

    let encoded: String = byte_serialize(query.trim().as_bytes()).collect();
    Ok(template.replace(QUERY_PLACEHOLDER, &encoded))
}

/// Resolves an href found on a page into an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, fragment-only anchors, non-HTTP schemes, and
/// anything that fails to parse.
pub fn resolve_href(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") || href.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
