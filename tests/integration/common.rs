//! Shared fixtures: configuration and canned catalog/source pages

use edition_scout::config::{Config, ListingLayout};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SERIES_PATH: &str = "/series/42-dune";

/// A configuration pointing every URL at the mock server
pub fn test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();

    config.crawler.max_concurrent_items = 4;
    config.crawler.max_retries = 1;
    config.crawler.retry_delay_secs = 0;
    config.crawler.request_timeout_secs = 5;

    config.user_agent.crawler_name = "TestScout".to_string();
    config.user_agent.contact_email = "test@example.com".to_string();

    let layout = ListingLayout {
        selector: "a.bookTitle".to_string(),
        page_size: 30,
    };
    config.listing.series = layout.clone();
    config.listing.author = layout;

    config.sources.bookchor_url = format!("{}/bookchor/search?query={{query}}", base_url);
    config.sources.bookish_santa_url = format!("{}/bookishsanta/search?q={{query}}", base_url);
    config.sources.shbi_url = format!("{}/shbi/search?query={{query}}", base_url);

    config.output.database_path = dir.join("scout.db").display().to_string();
    config.output.report_path = dir.join("report.csv").display().to_string();

    config
}

pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.into())
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// A listing page with one `a.bookTitle` anchor per (name, href)
pub fn listing_page(entries: &[(&str, &str)]) -> String {
    let anchors: String = entries
        .iter()
        .map(|(name, href)| {
            format!(
                r#"<tr><td><a class="bookTitle" href="{}"><span>{}</span></a></td></tr>"#,
                href, name
            )
        })
        .collect();
    format!(
        "<html><body><table>{}</table><a href=\"/about\">About</a></body></html>",
        anchors
    )
}

/// An item page with the given title and optional editions link
pub fn item_page(title: &str, editions_href: Option<&str>) -> String {
    let editions = editions_href
        .map(|href| format!(r#"<a href="{}">All Editions</a>"#, href))
        .unwrap_or_default();
    format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1>{}</body></html>",
        title, title, editions
    )
}

/// An editions page listing the given ISBN-13s
pub fn editions_page(isbns: &[&str]) -> String {
    let rows: String = isbns
        .iter()
        .map(|isbn| {
            format!(
                "<div class=\"dataRow\">ISBN: 0000000000 (ISBN13: {})</div>",
                isbn
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", rows)
}

/// Mounts an item page at `item_path`
pub async fn mount_item(
    server: &MockServer,
    item_path: &str,
    title: &str,
    editions_href: Option<&str>,
) {
    Mock::given(method("GET"))
        .and(path(item_path))
        .respond_with(html(item_page(title, editions_href)))
        .mount(server)
        .await;
}

/// Mounts a listing page for the series seed
pub async fn mount_listing_page(server: &MockServer, page: u32, entries: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path(SERIES_PATH))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(html(listing_page(entries)))
        .mount(server)
        .await;
}

/// Mounts catch-all "not in stock" answers for all three sources
///
/// Mount these after any specific source mocks; the earlier mock wins.
pub async fn mount_sources_negative(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/bookchor/search"))
        .respond_with(html(r#"<div class="pi-price">Out of Stock</div>"#))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bookishsanta/search"))
        .respond_with(html("<p>No products found</p>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shbi/search"))
        .respond_with(html(
            r#"<p class="search-results-count">0 result(s) found</p>"#,
        ))
        .mount(server)
        .await;
}
