//! End-to-end runs of the scout against a mock catalog

use crate::common::*;
use edition_scout::config::Config;
use edition_scout::input::CoveredSet;
use edition_scout::storage::{RunStatus, Storage};
use edition_scout::{AccumulationStore, Discovery, Scout, WorkItem};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DUNE_ISBN: &str = "9780441172719";

/// Mounts a two-page series: three items on page 1, nothing on page 2
///
/// Dune has an editions page and stock at Bookchor and Bookish Santa,
/// Emma has an editions page and SHBI results, Ulysses has no editions link.
async fn mount_series(server: &MockServer) {
    mount_listing_page(
        server,
        1,
        &[
            ("Dune", "/book/show/1.Dune"),
            ("Emma", "/book/show/2.Emma"),
            ("Ulysses", "/book/show/3.Ulysses"),
        ],
    )
    .await;
    mount_listing_page(server, 2, &[]).await;

    mount_item(
        server,
        "/book/show/1.Dune",
        "Dune (Dune, #1) by Frank Herbert | Goodreads",
        Some("/work/editions/1-dune"),
    )
    .await;
    mount_item(
        server,
        "/book/show/2.Emma",
        "Emma by Jane Austen | Goodreads",
        Some("/work/editions/2-emma"),
    )
    .await;
    mount_item(
        server,
        "/book/show/3.Ulysses",
        "Ulysses by James Joyce | Goodreads",
        None,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/work/editions/1-dune"))
        .respond_with(html(editions_page(&[DUNE_ISBN, "9780340960196"])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/work/editions/2-emma"))
        .respond_with(html(editions_page(&["9780141439587"])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bookchor/search"))
        .and(query_param("query", DUNE_ISBN))
        .respond_with(html(r#"<div class="pi-price">Rs. 199</div>"#))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bookishsanta/search"))
        .and(query_param("q", "Dune"))
        .respond_with(html(
            r#"<div class="productitem"><div class="productitem--info">
               <h2 class="productitem--title"><a href="/p/dune">Dune</a></h2>
               </div></div>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shbi/search"))
        .and(query_param("query", "Emma"))
        .respond_with(html(
            r#"<p class="search-results-count">4 result(s) found</p>"#,
        ))
        .mount(server)
        .await;
    mount_sources_negative(server).await;
}

fn open_store(config: &Config) -> AccumulationStore {
    AccumulationStore::load(Path::new(&config.output.database_path)).unwrap()
}

fn series_discovery(server: &MockServer) -> Discovery {
    Discovery::Series {
        seed_url: format!("{}{}", server.uri(), SERIES_PATH),
    }
}

#[tokio::test]
async fn test_series_run_resolves_all_items() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());
    mount_series(&server).await;

    let store = open_store(&config);
    let mut scout = Scout::new(config.clone(), "hash".to_string(), store, CoveredSet::new())
        .unwrap();
    let summary = scout.run(series_discovery(&server)).await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.resolved, 3);
    assert!(summary.is_complete());

    let store = scout.store();
    assert_eq!(store.len(), 3);

    let dune = store.get("Dune").unwrap();
    assert_eq!(dune.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(dune.series.as_deref(), Some("Dune, #1"));
    assert_eq!(dune.identifiers.len(), 2);
    assert_eq!(dune.availability.bookchor, vec![DUNE_ISBN.to_string()]);
    assert!(dune.availability.bookish_santa);
    assert!(!dune.availability.shbi);

    let emma = store.get("Emma").unwrap();
    assert!(emma.availability.bookchor.is_empty());
    assert!(emma.availability.shbi);

    let ulysses = store.get("Ulysses").unwrap();
    assert_eq!(ulysses.editions_url, None);
    assert!(ulysses.identifiers.is_empty());
    assert!(ulysses.availability.bookchor.is_empty());

    let report = std::fs::read_to_string(&config.output.report_path).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("Dune,"));
    assert!(lines[2].starts_with("Emma,"));
    assert!(lines[3].starts_with("Ulysses,"));

    let run = store.backend().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.resolved, 3);
}

#[tokio::test]
async fn test_covered_items_are_never_fetched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_listing_page(
        &server,
        1,
        &[("Foo", "/book/show/10.Foo"), ("Bar", "/book/show/11.Bar")],
    )
    .await;
    mount_listing_page(&server, 2, &[]).await;
    mount_item(&server, "/book/show/10.Foo", "Foo by Someone", None).await;
    Mock::given(method("GET"))
        .and(path("/book/show/11.Bar"))
        .respond_with(html(item_page("Bar by Someone", None)))
        .expect(0)
        .mount(&server)
        .await;
    mount_sources_negative(&server).await;

    let covered: CoveredSet = ["Bar"].into_iter().collect();
    let mut scout =
        Scout::new(config.clone(), "hash".to_string(), open_store(&config), covered).unwrap();
    let summary = scout.run(series_discovery(&server)).await.unwrap();

    assert_eq!(summary.covered, 1);
    assert_eq!(summary.resolved, 1);
    assert!(scout.store().contains("Foo"));
    assert!(!scout.store().contains("Bar"));
}

#[tokio::test]
async fn test_second_run_skips_stored_items() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_listing_page(&server, 1, &[("Foo", "/book/show/10.Foo")]).await;
    mount_listing_page(&server, 2, &[]).await;
    Mock::given(method("GET"))
        .and(path("/book/show/10.Foo"))
        .respond_with(html(item_page("Foo by Someone", None)))
        .expect(1)
        .mount(&server)
        .await;
    mount_sources_negative(&server).await;

    let mut first =
        Scout::new(config.clone(), "hash".to_string(), open_store(&config), CoveredSet::new())
            .unwrap();
    first.run(series_discovery(&server)).await.unwrap();
    drop(first);

    let mut second =
        Scout::new(config.clone(), "hash".to_string(), open_store(&config), CoveredSet::new())
            .unwrap();
    let summary = second.run(series_discovery(&server)).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.resolved, 0);
    assert_eq!(second.store().len(), 1);
    assert_eq!(second.store().backend().count_runs().unwrap(), 2);
}

#[tokio::test]
async fn test_failing_item_is_dropped_after_retries() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_listing_page(
        &server,
        1,
        &[("Foo", "/book/show/10.Foo"), ("Bad", "/book/show/12.Bad")],
    )
    .await;
    mount_listing_page(&server, 2, &[]).await;
    mount_item(&server, "/book/show/10.Foo", "Foo by Someone", None).await;
    // first dispatch plus one retry round
    Mock::given(method("GET"))
        .and(path("/book/show/12.Bad"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_sources_negative(&server).await;

    let mut scout =
        Scout::new(config.clone(), "hash".to_string(), open_store(&config), CoveredSet::new())
            .unwrap();
    let summary = scout.run(series_discovery(&server)).await.unwrap();

    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.dropped.len(), 1);
    assert!(summary.dropped[0].input.url.ends_with("/book/show/12.Bad"));
    assert!(scout.store().contains("Foo"));
    assert!(!scout.store().contains("Bad"));

    let run = scout.store().backend().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(run.dropped, 1);
}

#[tokio::test]
async fn test_item_recovers_in_retry_round() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    // first request fails, later ones succeed
    Mock::given(method("GET"))
        .and(path("/book/show/13.Flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_item(&server, "/book/show/13.Flaky", "Flaky by Someone", None).await;
    mount_sources_negative(&server).await;

    let items = vec![WorkItem::new(
        "Flaky",
        format!("{}/book/show/13.Flaky", server.uri()),
    )];
    let mut scout =
        Scout::new(config.clone(), "hash".to_string(), open_store(&config), CoveredSet::new())
            .unwrap();
    let summary = scout.run(Discovery::Items(items)).await.unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.resolved, 1);
    assert!(scout.store().contains("Flaky"));
}

#[tokio::test]
async fn test_items_mode_names_from_title() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_item(
        &server,
        "/book/show/20.Neuromancer",
        "Neuromancer (Sprawl, #1) by William Gibson | Goodreads",
        None,
    )
    .await;
    mount_sources_negative(&server).await;

    let url = format!("{}/book/show/20.Neuromancer", server.uri());
    let items = vec![WorkItem::from_url(url.clone()), WorkItem::from_url(url)];

    let mut scout =
        Scout::new(config.clone(), "hash".to_string(), open_store(&config), CoveredSet::new())
            .unwrap();
    let summary = scout.run(Discovery::Items(items)).await.unwrap();

    assert_eq!(summary.resolved, 1);
    let record = scout.store().get("Neuromancer").unwrap();
    assert_eq!(record.author.as_deref(), Some("William Gibson"));
    assert_eq!(record.series.as_deref(), Some("Sprawl, #1"));
}

#[tokio::test]
async fn test_store_survives_between_processes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path());
    mount_series(&server).await;

    let mut scout =
        Scout::new(config.clone(), "hash".to_string(), open_store(&config), CoveredSet::new())
            .unwrap();
    scout.run(series_discovery(&server)).await.unwrap();
    let before: Vec<_> = scout.into_store().get_all().cloned().collect();

    let reloaded = open_store(&config);
    let after: Vec<_> = reloaded.get_all().cloned().collect();

    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(after.iter()) {
        assert!(a.same_content(b));
    }
}
