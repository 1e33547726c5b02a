//! Group-paced batch retrieval.
//!
//! Items are split into consecutive groups of at most `concurrency`. Every
//! member of a group is in flight at once and the next group starts only
//! after all of them settled, with a fixed pause in between. A failing item
//! is recorded and dropped; it never aborts the batch.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Error;

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FetchItem {
    pub identity: String,
}

impl FetchItem {
    pub fn new(identity: impl Into<String>) -> Self {
        Self { identity: identity.into() }
    }
}

/// Pacing for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum number of fetches in flight (group size).
    pub concurrency: usize,
    /// Pause between two consecutive groups.
    pub inter_batch_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { concurrency: 2, inter_batch_delay: Duration::from_millis(1000) }
    }
}

/// An item that could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FetchFailure {
    pub identity: String,
    pub reason: String,
}

/// Outcome of one batch.
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
    /// Successful items, in input order.
    pub items: Vec<T>,
    /// Items whose fetch failed.
    pub failures: Vec<FetchFailure>,
    /// Number of items the batch was asked for.
    pub requested: usize,
    /// Gaps between groups that were reached, zero-length ones included.
    pub pauses: usize,
    /// Whether the batch was abandoned before finishing.
    pub cancelled: bool,
}

impl<T> BatchResult<T> {
    fn empty(requested: usize) -> Self {
        Self { items: Vec::new(), failures: Vec::new(), requested, pauses: 0, cancelled: false }
    }

    pub fn succeeded(&self) -> usize {
        self.items.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every requested item was retrieved.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.items.len() == self.requested
    }

    /// Human-readable degraded count, e.g. "4 of 5 retrieved".
    pub fn summary(&self) -> String {
        format!("{} of {} retrieved", self.items.len(), self.requested)
    }
}

/// Bounded-concurrency fetcher with inter-group pacing.
#[derive(Debug, Clone)]
pub struct BatchFetcher {
    options: BatchOptions,
}

impl BatchFetcher {
    /// Create a fetcher.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when `concurrency` is 0.
    pub fn new(options: BatchOptions) -> Result<Self, Error> {
        if options.concurrency == 0 {
            return Err(Error::InvalidInput("concurrency must be at least 1".into()));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Retrieve every item through `fetch_one`.
    pub async fn fetch_all<T, E, F, Fut>(&self, items: &[FetchItem], fetch_one: F) -> BatchResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run(items, fetch_one, None).await
    }

    /// Like [`fetch_all`](Self::fetch_all), but stops as soon as `cancel` fires.
    ///
    /// Successes of groups that already settled are kept; the in-flight group
    /// is dropped.
    pub async fn fetch_all_until<T, E, F, Fut>(
        &self, items: &[FetchItem], fetch_one: F, cancel: &CancellationToken,
    ) -> BatchResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run(items, fetch_one, Some(cancel)).await
    }

    async fn run<T, E, F, Fut>(
        &self, items: &[FetchItem], fetch_one: F, cancel: Option<&CancellationToken>,
    ) -> BatchResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut result = BatchResult::empty(items.len());
        if items.is_empty() {
            return result;
        }

        let start = Instant::now();
        let delay = self.options.inter_batch_delay;

        for (index, group) in items.chunks(self.options.concurrency).enumerate() {
            if index > 0 {
                result.pauses += 1;
                if !delay.is_zero() && !wait(tokio::time::sleep(delay), cancel).await {
                    result.cancelled = true;
                    break;
                }
            }

            let in_flight = join_all(group.iter().map(|item| fetch_one(item.identity.clone())));
            let Some(settled) = wait_for(in_flight, cancel).await else {
                result.cancelled = true;
                break;
            };

            for (item, outcome) in group.iter().zip(settled) {
                match outcome {
                    Ok(value) => result.items.push(value),
                    Err(e) => {
                        tracing::warn!(identity = %item.identity, error = %e, "dropping failed batch item");
                        result.failures.push(FetchFailure { identity: item.identity.clone(), reason: e.to_string() });
                    }
                }
            }
        }

        tracing::info!(
            requested = result.requested,
            succeeded = result.succeeded(),
            failed = result.failed(),
            cancelled = result.cancelled,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch finished"
        );

        result
    }
}

async fn wait_for<Fut: Future>(fut: Fut, cancel: Option<&CancellationToken>) -> Option<Fut::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => None,
            out = fut => Some(out),
        },
        None => Some(fut.await),
    }
}

async fn wait<Fut: Future<Output = ()>>(fut: Fut, cancel: Option<&CancellationToken>) -> bool {
    wait_for(fut, cancel).await.is_some()
}
