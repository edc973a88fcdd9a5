//! Run coordinator
//!
//! Drives one scout run end to end:
//! - discovery (listing pages, or a fixed item list)
//! - filtering of covered, already stored and repeated items
//! - one dispatch round per listing page, merged and persisted at once
//! - retry rounds over everything that failed
//! - run bookkeeping and the CSV report

use crate::config::{Config, ListingLayout};
use crate::crawler::dispatcher::{Dispatcher, HttpPipeline, ItemFailure, ItemPipeline};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::paginator::Paginator;
use crate::input::CoveredSet;
use crate::item::{BookRecord, WorkItem};
use crate::output::write_report;
use crate::storage::{AccumulationStore, RunStatus};
use crate::url::normalize_url;
use crate::ScoutError;
use reqwest::Client;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Where the items of a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// Paginated series listing
    Series { seed_url: String },

    /// Paginated author listing
    Author { seed_url: String },

    /// A fixed list of item pages
    Items(Vec<WorkItem>),
}

/// Counters of one finished run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Listing pages walked
    pub pages: u32,

    /// Candidates seen, before filtering
    pub discovered: usize,

    /// Candidates skipped because they are covered elsewhere
    pub covered: usize,

    /// Candidates skipped because the store already has them
    pub skipped: usize,

    /// Items resolved and merged into the store
    pub resolved: usize,

    /// Items still failing after the last retry round
    pub dropped: Vec<ItemFailure<WorkItem>>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages, {} discovered, {} covered, {} already stored, {} resolved, {} dropped",
            self.pages,
            self.discovered,
            self.covered,
            self.skipped,
            self.resolved,
            self.dropped.len()
        )
    }
}

/// Mutable bookkeeping of the run in progress
#[derive(Default)]
struct RunState {
    seen: HashSet<String>,
    summary: RunSummary,
    failures: Vec<ItemFailure<WorkItem>>,
}

/// Coordinates discovery, dispatch and accumulation for one run
pub struct Scout<P: ItemPipeline = HttpPipeline> {
    config: Arc<Config>,
    config_hash: String,
    client: Client,
    store: AccumulationStore,
    dispatcher: Dispatcher<P>,
    covered: CoveredSet,
}

impl Scout<HttpPipeline> {
    /// Creates a scout that resolves items over HTTP
    pub fn new(
        config: Config,
        config_hash: String,
        store: AccumulationStore,
        covered: CoveredSet,
    ) -> Result<Self, ScoutError> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let pipeline = HttpPipeline::new(client.clone(), &config.catalog, &config.sources);
        Ok(Self::with_pipeline(
            config,
            config_hash,
            client,
            store,
            pipeline,
            covered,
        ))
    }
}

impl<P: ItemPipeline> Scout<P> {
    /// Creates a scout around any item pipeline
    ///
    /// `client` is used for listing pages only.
    pub fn with_pipeline(
        config: Config,
        config_hash: String,
        client: Client,
        store: AccumulationStore,
        pipeline: P,
        covered: CoveredSet,
    ) -> Self {
        let dispatcher = Dispatcher::from_config(pipeline, &config.crawler);
        Self {
            config: Arc::new(config),
            config_hash,
            client,
            store,
            dispatcher,
            covered,
        }
    }

    pub fn store(&self) -> &AccumulationStore {
        &self.store
    }

    pub fn into_store(self) -> AccumulationStore {
        self.store
    }

    /// Runs discovery, dispatch and retries, then writes the report
    pub async fn run(&mut self, discovery: Discovery) -> Result<RunSummary, ScoutError> {
        let run_id = self.store.begin_run(&self.config_hash)?;
        tracing::info!(
            "Starting run {} with {} stored items",
            run_id,
            self.store.len()
        );

        match self.run_inner(discovery).await {
            Ok(summary) => {
                let status = if summary.is_complete() {
                    RunStatus::Completed
                } else {
                    RunStatus::Partial
                };
                self.store.finish_run(
                    run_id,
                    status,
                    summary.resolved as u64,
                    summary.dropped.len() as u64,
                )?;

                write_report(
                    self.store.get_all(),
                    Path::new(&self.config.output.report_path),
                )?;

                tracing::info!("Run {} {}: {}", run_id, status.to_db_string(), summary);
                Ok(summary)
            }
            Err(e) => {
                if let Err(mark_err) = self.store.finish_run(run_id, RunStatus::Failed, 0, 0) {
                    tracing::error!("Could not mark run {} failed: {}", run_id, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self, discovery: Discovery) -> Result<RunSummary, ScoutError> {
        let config = Arc::clone(&self.config);
        let mut state = RunState::default();

        match discovery {
            Discovery::Series { seed_url } => {
                self.walk_listing(&config.listing.series, &seed_url, &mut state)
                    .await?
            }
            Discovery::Author { seed_url } => {
                self.walk_listing(&config.listing.author, &seed_url, &mut state)
                    .await?
            }
            Discovery::Items(items) => {
                state.summary.discovered = items.len();
                let batch = self.select(items, &mut state);
                self.dispatch_round(batch, &mut state).await?;
            }
        }

        let failures = std::mem::take(&mut state.failures);
        let store = &mut self.store;
        let summary = &mut state.summary;
        let dropped = self
            .dispatcher
            .retry_failures(failures, |_, successes| merge(store, successes, summary))
            .await?;

        state.summary.dropped = dropped;
        Ok(state.summary)
    }

    /// Walks a listing page by page, dispatching each page's new items
    async fn walk_listing(
        &mut self,
        layout: &ListingLayout,
        seed_url: &str,
        state: &mut RunState,
    ) -> Result<(), ScoutError> {
        let paginator = Paginator::new(
            self.client.clone(),
            layout,
            &self.config.catalog,
            self.config.crawler.max_pages,
        )?;
        let mut walk = paginator.walk(seed_url);

        while let Some((page, candidates)) = walk.next_page().await {
            state.summary.discovered += candidates.len();

            let items = candidates
                .into_iter()
                .map(|candidate| WorkItem::new(candidate.name, candidate.href))
                .collect();
            let batch = self.select(items, state);
            tracing::info!("Page #{}: {} new items", page, batch.len());

            self.dispatch_round(batch, state).await?;
        }

        state.summary.pages += walk.pages_walked();
        if let Some(reason) = walk.stop_reason() {
            tracing::debug!("Listing walk ended: {:?}", reason);
        }
        Ok(())
    }

    /// Drops repeated, covered and already stored items
    fn select(&self, items: Vec<WorkItem>, state: &mut RunState) -> Vec<WorkItem> {
        let mut batch = Vec::new();

        for item in items {
            let key = normalize_url(&item.url)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| item.url.clone());
            if !state.seen.insert(key) {
                tracing::debug!("Repeated item {}", item.url);
                continue;
            }

            if self.covered.covers(item.name.as_deref(), &item.url) {
                tracing::debug!("Covered: {}", item.url);
                state.summary.covered += 1;
                continue;
            }

            let stored = match &item.name {
                Some(name) => self.store.contains(name),
                None => self.store.contains_url(&item.url),
            };
            if stored {
                tracing::debug!("Already stored: {}", item.url);
                state.summary.skipped += 1;
                continue;
            }

            batch.push(item);
        }

        batch
    }

    async fn dispatch_round(
        &mut self,
        batch: Vec<WorkItem>,
        state: &mut RunState,
    ) -> Result<(), ScoutError> {
        if batch.is_empty() {
            return Ok(());
        }

        let outcome = self.dispatcher.dispatch(batch).await;
        merge(&mut self.store, outcome.successes, &mut state.summary)?;
        state.failures.extend(outcome.failures);
        Ok(())
    }
}

/// Upserts one round's successes and persists them
fn merge(
    store: &mut AccumulationStore,
    successes: BTreeMap<String, BookRecord>,
    summary: &mut RunSummary,
) -> Result<(), ScoutError> {
    let count = successes.len();
    for record in successes.into_values() {
        store.upsert(record);
    }
    store.persist()?;

    summary.resolved += count;
    tracing::info!("Merged {} records ({} stored)", count, store.len());
    Ok(())
}
