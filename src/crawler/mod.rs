//! Crawler module
//!
//! This module contains the scouting logic, including:
//! - HTTP fetching
//! - Listing pagination and candidate extraction
//! - Identifier resolution and availability checks
//! - Bounded parallel dispatch with retry rounds
//! - Overall run coordination

mod availability;
mod coordinator;
mod dispatcher;
mod fetcher;
mod paginator;
mod parser;
mod resolver;

pub use availability::{
    bookchor_in_stock, bookish_santa_in_stock, shbi_has_results, AvailabilityChecker,
    BOOKCHOR_LOOKUPS_IN_FLIGHT,
};
pub use coordinator::{Discovery, RunSummary, Scout};
pub use dispatcher::{
    BatchOutcome, DispatchOutcome, Dispatcher, HttpPipeline, ItemFailure, ItemPipeline, WorkerPool,
};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use paginator::{ListingWalk, PageStop, Paginator};
pub use parser::{
    extract_candidates, extract_isbn13, extract_title, find_marker_link, parse_selector,
    ListingCandidate, ListingPage,
};
pub use resolver::{ItemPage, Resolver};
