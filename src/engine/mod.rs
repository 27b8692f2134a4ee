//! Execution engine module
//!
//! Main read loop and seed orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Engine` - Reads input records, expands seeds and admits workers
//! - `Dispatcher` - Bounded concurrency with fail-fast cancellation
//! - `PaginationWorker` - Per-seed request/retry/paginate state machine
//! - `RunStats` - Counters shared by all workers

mod dispatcher;
mod types;
mod worker;

pub use dispatcher::Dispatcher;
pub use types::{RunStats, StatsSnapshot, WorkerConfig, WorkerContext};
pub use worker::{classify, PaginationWorker, StatusClass};

use crate::config::{CollectionSelector, RunConfig};
use crate::error::{Error, Result};
use crate::expand::SeedExpander;
use crate::http::{HttpClient, RateLimiter, WireSink};
use crate::output::ResultEmitter;
use crate::types::{JsonValue, Seed};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Drives one run from input records to emitted results
#[derive(Debug)]
pub struct Engine {
    /// Shared worker handles
    ctx: Arc<WorkerContext>,
    /// Collection field selection
    selector: CollectionSelector,
    /// Capacity of the worker pool
    parallelism: usize,
}

impl Engine {
    /// Build an engine from a validated config
    pub fn new(
        config: &RunConfig,
        emitter: Arc<ResultEmitter>,
        wire: Option<Arc<WireSink>>,
        token: CancellationToken,
    ) -> Result<Self> {
        let client = HttpClient::with_config(config.http_client_config())?;
        let limiter = RateLimiter::new(&config.rate_limiter_config());
        let worker_config = WorkerConfig::new()
            .with_execute(config.execute)
            .with_verbose(config.verbose)
            .with_filter_error(config.filter_error);

        let ctx = WorkerContext {
            client,
            limiter,
            backoff: config.backoff_policy(),
            emitter,
            wire,
            stats: Arc::new(RunStats::new()),
            token,
            config: worker_config,
        };

        Ok(Self::from_context(
            ctx,
            config.collection_selector(),
            config.parallelism,
        ))
    }

    /// Build an engine around an existing worker context
    pub fn from_context(
        ctx: WorkerContext,
        selector: CollectionSelector,
        parallelism: usize,
    ) -> Self {
        Self {
            ctx: Arc::new(ctx),
            selector,
            parallelism: parallelism.max(1),
        }
    }

    /// Consume input records until EOF or the first fatal error
    ///
    /// Seeds are admitted in input order. The call returns once every
    /// admitted worker has finished.
    pub async fn run(
        &self,
        mut input: mpsc::Receiver<Result<JsonValue>>,
        expander: &dyn SeedExpander,
    ) -> Result<StatsSnapshot> {
        let start = Instant::now();
        let mut dispatcher = Dispatcher::new(self.parallelism, self.ctx.token.clone());
        let mut sequence: u64 = 0;

        'records: loop {
            let record = tokio::select! {
                biased;
                () = self.ctx.token.cancelled() => break,
                record = input.recv() => record,
            };
            let Some(record) = record else { break };

            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    dispatcher.fail(e);
                    break;
                }
            };
            self.ctx.stats.add_record();

            let urls = match expander.expand(&record) {
                Ok(urls) => urls,
                Err(e) => {
                    dispatcher.fail(e);
                    break;
                }
            };

            for url in urls {
                let collection_field = match self.selector.resolve(&url) {
                    Ok(field) => field,
                    Err(e) => {
                        dispatcher.fail(e);
                        break 'records;
                    }
                };

                let seed = Seed::new(sequence, url, record.clone());
                sequence += 1;

                let worker = PaginationWorker::new(self.ctx.clone(), seed, collection_field);
                if let Err(e) = dispatcher.admit(worker.run_and_emit()).await {
                    dispatcher.fail(e);
                    break 'records;
                }
                self.ctx.stats.add_seed();
            }
        }

        // Stop the input thread from decoding further records.
        drop(input);
        debug!("input closed, waiting for {} workers", dispatcher.in_flight());

        let outcome = dispatcher.finish().await;
        let stats = self.ctx.stats.snapshot();
        debug!(
            records = stats.records,
            seeds = stats.seeds,
            requests = stats.requests,
            retries = stats.retries,
            emitted = stats.emitted,
            dropped = stats.dropped,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "run finished"
        );

        match outcome {
            Ok(()) if self.ctx.token.is_cancelled() => Err(Error::Cancelled),
            Ok(()) => Ok(stats),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests;
