//! Paginator, resolver and availability checks against mock servers

use crate::common::*;
use edition_scout::crawler::{
    build_http_client, AvailabilityChecker, PageStop, Paginator, Resolver,
    BOOKCHOR_LOOKUPS_IN_FLIGHT,
};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_pagination_stops_at_empty_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_listing_page(
        &server,
        1,
        &[
            ("Dune", "/book/show/1.Dune"),
            ("Dune Messiah", "/book/show/2.Dune_Messiah"),
            ("Children of Dune", "/book/show/3.Children_of_Dune"),
        ],
    )
    .await;
    mount_listing_page(&server, 2, &[]).await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let paginator = Paginator::new(
        client,
        &config.listing.series,
        &config.catalog,
        config.crawler.max_pages,
    )
    .unwrap();

    let seed = format!("{}{}", server.uri(), SERIES_PATH);
    let mut walk = paginator.walk(&seed);
    let mut candidates = Vec::new();
    while let Some((_, page)) = walk.next_page().await {
        candidates.extend(page);
    }

    let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Dune", "Dune Messiah", "Children of Dune"]);
    assert_eq!(
        candidates[0].href,
        format!("{}/book/show/1.Dune", server.uri())
    );
    assert_eq!(walk.pages_walked(), 1);
    assert_eq!(walk.stop_reason(), Some(&PageStop::EmptyPage(2)));
}

#[tokio::test]
async fn test_pagination_continues_past_page_without_items() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    // page 1 matches the selector, but only with author links
    mount_listing_page(&server, 1, &[("Frank Herbert", "/author/show/58.Frank_Herbert")]).await;
    mount_listing_page(&server, 2, &[("Dune", "/book/show/1.Dune")]).await;
    mount_listing_page(&server, 3, &[]).await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let paginator = Paginator::new(
        client,
        &config.listing.series,
        &config.catalog,
        config.crawler.max_pages,
    )
    .unwrap();

    let seed = format!("{}{}", server.uri(), SERIES_PATH);
    let mut walk = paginator.walk(&seed);
    let mut candidates = Vec::new();
    while let Some((_, page)) = walk.next_page().await {
        candidates.extend(page);
    }

    let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Dune"]);
    assert_eq!(walk.pages_walked(), 2);
    assert_eq!(walk.stop_reason(), Some(&PageStop::EmptyPage(3)));
}

#[tokio::test]
async fn test_pagination_stops_on_failed_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_listing_page(&server, 1, &[("Dune", "/book/show/1.Dune")]).await;
    Mock::given(method("GET"))
        .and(path(SERIES_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let paginator = Paginator::new(
        client,
        &config.listing.series,
        &config.catalog,
        config.crawler.max_pages,
    )
    .unwrap();

    let seed = format!("{}{}", server.uri(), SERIES_PATH);
    let candidates = paginator.paginate(&seed).await;
    assert_eq!(candidates.len(), 1);
}

#[tokio::test]
async fn test_pagination_page_ceiling() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), dir.path());
    config.crawler.max_pages = 2;

    // every page has the same candidate, so only the ceiling stops the walk
    Mock::given(method("GET"))
        .and(path(SERIES_PATH))
        .respond_with(html(listing_page(&[("Dune", "/book/show/1.Dune")])))
        .expect(2)
        .mount(&server)
        .await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let paginator = Paginator::new(
        client,
        &config.listing.series,
        &config.catalog,
        config.crawler.max_pages,
    )
    .unwrap();

    let seed = format!("{}{}", server.uri(), SERIES_PATH);
    let mut walk = paginator.walk(&seed);
    while walk.next_page().await.is_some() {}

    assert_eq!(walk.stop_reason(), Some(&PageStop::Ceiling(2)));
}

#[tokio::test]
async fn test_resolver_follows_editions_link() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_item(
        &server,
        "/book/show/1.Dune",
        "Dune (Dune, #1) by Frank Herbert | Goodreads",
        Some("/work/editions/1-dune"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/work/editions/1-dune"))
        .respond_with(html(editions_page(&[
            "9780441172719",
            "9780340960196",
            "9780441172719",
        ])))
        .mount(&server)
        .await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let resolver = Resolver::new(client, &config.catalog);

    let item_url = format!("{}/book/show/1.Dune", server.uri());
    let page = resolver.inspect_item(&item_url).await.unwrap();
    let editions_url = page.editions_url.expect("editions link");
    assert_eq!(editions_url, format!("{}/work/editions/1-dune", server.uri()));
    assert_eq!(
        page.title.as_deref(),
        Some("Dune (Dune, #1) by Frank Herbert | Goodreads")
    );

    let identifiers = resolver.extract_identifiers(&editions_url).await.unwrap();
    let expected: BTreeSet<String> = ["9780340960196", "9780441172719"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(identifiers, expected);
}

#[tokio::test]
async fn test_resolver_missing_marker() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_item(&server, "/book/show/7.Lonely", "Lonely by Someone", None).await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let resolver = Resolver::new(client, &config.catalog);

    let item_url = format!("{}/book/show/7.Lonely", server.uri());
    assert_eq!(resolver.resolve_editions(&item_url).await.unwrap(), None);
}

#[tokio::test]
async fn test_resolver_propagates_http_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    Mock::given(method("GET"))
        .and(path("/book/show/8.Broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let resolver = Resolver::new(client, &config.catalog);

    let item_url = format!("{}/book/show/8.Broken", server.uri());
    assert!(resolver.inspect_item(&item_url).await.is_err());
}

#[tokio::test]
async fn test_availability_across_sources() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    Mock::given(method("GET"))
        .and(path("/bookchor/search"))
        .and(query_param("query", "9780441172719"))
        .respond_with(html(r#"<div class="pi-price">Rs. 199</div>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bookishsanta/search"))
        .and(query_param("q", "Dune"))
        .respond_with(html(
            r#"<div class="productitem"><div class="productitem--info">
               <h2 class="productitem--title"><a href="/p/dune">Dune</a></h2>
               </div></div>"#,
        ))
        .mount(&server)
        .await;
    mount_sources_negative(&server).await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let checker = AvailabilityChecker::new(client, &config.sources);

    let identifiers: BTreeSet<String> = ["9780340960196", "9780441172719"]
        .into_iter()
        .map(String::from)
        .collect();
    let availability = checker.check_all("Dune", &identifiers).await;

    assert_eq!(availability.bookchor, vec!["9780441172719".to_string()]);
    assert!(availability.bookish_santa);
    assert!(!availability.shbi);
}

#[tokio::test]
async fn test_availability_degrades_on_source_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let checker = AvailabilityChecker::new(client, &config.sources);

    let identifiers: BTreeSet<String> = ["9780441172719".to_string()].into_iter().collect();
    let availability = checker.check_all("Dune", &identifiers).await;

    assert!(availability.bookchor.is_empty());
    assert!(!availability.bookish_santa);
    assert!(!availability.shbi);
}

#[tokio::test]
async fn test_no_identifiers_means_no_bookchor_lookups() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    Mock::given(method("GET"))
        .and(path("/bookchor/search"))
        .respond_with(html(r#"<div class="pi-price">Rs. 199</div>"#))
        .expect(0)
        .mount(&server)
        .await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let checker = AvailabilityChecker::new(client, &config.sources);

    assert!(checker.check_bookchor(&BTreeSet::new()).await.is_empty());
}

#[tokio::test]
async fn test_bookchor_lookups_are_bounded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());
    let delay = Duration::from_millis(200);

    Mock::given(method("GET"))
        .and(path("/bookchor/search"))
        .respond_with(html(r#"<div class="pi-price">Rs. 199</div>"#).set_delay(delay))
        .expect(6)
        .mount(&server)
        .await;

    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let checker = AvailabilityChecker::new(client, &config.sources);

    let identifiers: BTreeSet<String> = (0..6).map(|i| format!("978044117271{}", i)).collect();
    let started = Instant::now();
    let in_stock = checker.check_bookchor(&identifiers).await;
    let elapsed = started.elapsed();

    // six delayed lookups in waves of BOOKCHOR_LOOKUPS_IN_FLIGHT
    let waves = (identifiers.len() / BOOKCHOR_LOOKUPS_IN_FLIGHT) as u32;
    assert!(
        elapsed >= delay * waves,
        "lookups finished in {:?}, expected at least {:?}",
        elapsed,
        delay * waves
    );
    assert_eq!(in_stock, identifiers.into_iter().collect::<Vec<_>>());
}
