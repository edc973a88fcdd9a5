//! Work dispatch
//!
//! A bounded [`WorkerPool`] runs one future per item with at most N in
//! flight. Each item runs in its own task, so an error or a panic fails that
//! item alone. The [`Dispatcher`] layers retry rounds on top: failed items
//! are re-dispatched after a cool-down until the retry budget is spent.

use crate::config::{CatalogConfig, CrawlerConfig, SourcesConfig};
use crate::crawler::availability::AvailabilityChecker;
use crate::crawler::resolver::Resolver;
use crate::item::{BookRecord, WorkItem};
use crate::title::{BookTitle, TitleError};
use crate::ScoutError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Resolves one work item into a record
///
/// The production pipeline fetches pages over HTTP; tests substitute
/// deterministic pipelines.
pub trait ItemPipeline: Send + Sync + 'static {
    fn run(&self, item: WorkItem) -> impl Future<Output = Result<BookRecord, ScoutError>> + Send;
}

/// Item page → identifiers → availability, over HTTP
#[derive(Clone)]
pub struct HttpPipeline {
    resolver: Resolver,
    checker: AvailabilityChecker,
}

impl HttpPipeline {
    pub fn new(client: Client, catalog: &CatalogConfig, sources: &SourcesConfig) -> Self {
        Self {
            resolver: Resolver::new(client.clone(), catalog),
            checker: AvailabilityChecker::new(client, sources),
        }
    }
}

impl ItemPipeline for HttpPipeline {
    async fn run(&self, item: WorkItem) -> Result<BookRecord, ScoutError> {
        let page = self.resolver.inspect_item(&item.url).await?;

        let parsed = match page.title.as_deref().map(BookTitle::parse) {
            Some(Ok(title)) => Some(title),
            Some(Err(e)) if item.name.is_some() => {
                tracing::debug!("{}: {}", item.url, e);
                None
            }
            Some(Err(e)) => return Err(e.into()),
            None if item.name.is_some() => None,
            None => return Err(TitleError::Missing(item.url.clone()).into()),
        };

        let (name, author, series) = match (item.name, parsed) {
            (Some(name), Some(title)) => (name, Some(title.author), title.series),
            (Some(name), None) => (name, None, None),
            (None, Some(title)) => (title.title, Some(title.author), title.series),
            (None, None) => return Err(TitleError::Missing(item.url.clone()).into()),
        };

        let identifiers = match &page.editions_url {
            Some(editions_url) => self.resolver.extract_identifiers(editions_url).await?,
            None => BTreeSet::new(),
        };

        let availability = self.checker.check_all(&name, &identifiers).await;

        Ok(BookRecord {
            name,
            url: item.url,
            editions_url: page.editions_url,
            identifiers,
            author,
            series,
            availability,
            checked_at: Utc::now(),
        })
    }
}

/// An input that did not produce a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure<I> {
    pub input: I,
    pub reason: String,
}

/// Results of one pool run, split by outcome
#[derive(Debug)]
pub struct BatchOutcome<I, T> {
    pub successes: Vec<T>,
    pub failures: Vec<ItemFailure<I>>,
}

/// Runs work with a fixed maximum number of items in flight
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `work` over every input and waits for all of them
    ///
    /// Every input ends up in exactly one of `successes` or `failures`.
    pub async fn run<I, T, E, F, Fut>(&self, inputs: Vec<I>, work: F) -> BatchOutcome<I, T>
    where
        I: Clone + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let work = Arc::new(work);

        let results: Vec<(I, Result<T, String>)> = stream::iter(inputs)
            .map(|input| {
                let work = Arc::clone(&work);
                async move {
                    let handle = tokio::spawn((*work)(input.clone()));
                    let result = match handle.await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(e) if e.is_panic() => Err("worker panicked".to_string()),
                        Err(e) => Err(format!("worker cancelled: {}", e)),
                    };
                    (input, result)
                }
            })
            .buffer_unordered(self.size)
            .collect()
            .await;

        let mut outcome = BatchOutcome {
            successes: Vec::new(),
            failures: Vec::new(),
        };
        for (input, result) in results {
            match result {
                Ok(value) => outcome.successes.push(value),
                Err(reason) => outcome.failures.push(ItemFailure { input, reason }),
            }
        }
        outcome
    }
}

/// Successes keyed by item name, plus the items that failed
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub successes: BTreeMap<String, BookRecord>,
    pub failures: Vec<ItemFailure<WorkItem>>,
}

/// Runs work items through a pipeline with bounded concurrency and retry
pub struct Dispatcher<P: ItemPipeline> {
    pipeline: Arc<P>,
    pool: WorkerPool,
    max_retries: u32,
    retry_delay: Duration,
}

impl<P: ItemPipeline> Dispatcher<P> {
    pub fn new(pipeline: P, pool_size: usize, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            pool: WorkerPool::new(pool_size),
            max_retries,
            retry_delay,
        }
    }

    /// Creates a dispatcher sized by the `[crawler]` settings
    pub fn from_config(pipeline: P, config: &CrawlerConfig) -> Self {
        Self::new(
            pipeline,
            config.max_concurrent_items,
            config.max_retries,
            Duration::from_secs(config.retry_delay_secs),
        )
    }

    /// Runs one batch; every item ends up a success or a failure
    pub async fn dispatch(&self, items: Vec<WorkItem>) -> DispatchOutcome {
        if items.is_empty() {
            return DispatchOutcome::default();
        }

        tracing::info!(
            "Dispatching {} items ({} workers)",
            items.len(),
            self.pool.size()
        );

        let pipeline = Arc::clone(&self.pipeline);
        let batch = self
            .pool
            .run(items, move |item| {
                let pipeline = Arc::clone(&pipeline);
                async move { pipeline.run(item).await }
            })
            .await;

        let mut outcome = DispatchOutcome {
            successes: BTreeMap::new(),
            failures: batch.failures,
        };
        for record in batch.successes {
            if let Some(previous) = outcome.successes.get(&record.name) {
                if previous.url != record.url {
                    tracing::warn!(
                        "Name collision for '{}': {} replaced by {}",
                        record.name,
                        previous.url,
                        record.url
                    );
                }
            }
            outcome.successes.insert(record.name.clone(), record);
        }
        for failure in &outcome.failures {
            tracing::info!("Failed {}: {}", failure.input.url, failure.reason);
        }

        outcome
    }

    /// Re-dispatches failures for up to `max_retries` rounds
    ///
    /// Sleeps the retry delay before each round. `on_round` receives the
    /// round number (starting at 1) and that round's successes; an error from
    /// it aborts the retry loop. Returns the items still failing once the
    /// budget is spent.
    pub async fn retry_failures<F>(
        &self,
        mut failures: Vec<ItemFailure<WorkItem>>,
        mut on_round: F,
    ) -> Result<Vec<ItemFailure<WorkItem>>, ScoutError>
    where
        F: FnMut(u32, BTreeMap<String, BookRecord>) -> Result<(), ScoutError>,
    {
        for round in 1..=self.max_retries {
            if failures.is_empty() {
                break;
            }

            tracing::info!(
                "Retry round {}/{}: {} items, waiting {:?}",
                round,
                self.max_retries,
                failures.len(),
                self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;

            let items = failures.into_iter().map(|f| f.input).collect();
            let outcome = self.dispatch(items).await;
            on_round(round, outcome.successes)?;
            failures = outcome.failures;
        }

        for failure in &failures {
            tracing::warn!("Dropped {}: {}", failure.input.url, failure.reason);
        }

        Ok(failures)
    }

    /// One dispatch followed by retry rounds over its failures
    ///
    /// `on_round` sees round 0 for the initial dispatch.
    pub async fn dispatch_with_retry<F>(
        &self,
        items: Vec<WorkItem>,
        mut on_round: F,
    ) -> Result<Vec<ItemFailure<WorkItem>>, ScoutError>
    where
        F: FnMut(u32, BTreeMap<String, BookRecord>) -> Result<(), ScoutError>,
    {
        let outcome = self.dispatch(items).await;
        on_round(0, outcome.successes)?;
        self.retry_failures(outcome.failures, on_round).await
    }
}
