//! Engine types
//!
//! Shared worker context, configuration and run statistics.

use crate::http::{BackoffPolicy, HttpClient, RateLimiter, WireSink};
use crate::output::ResultEmitter;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Behaviour switches for workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Send requests (false = dry run, log only)
    pub execute: bool,
    /// Log every request
    pub verbose: bool,
    /// Drop terminal non-200 responses
    pub filter_error: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            execute: true,
            verbose: false,
            filter_error: false,
        }
    }
}

impl WorkerConfig {
    /// Create a new worker config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set execute mode
    #[must_use]
    pub fn with_execute(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    /// Set verbose request logging
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set error filtering
    #[must_use]
    pub fn with_filter_error(mut self, filter_error: bool) -> Self {
        self.filter_error = filter_error;
        self
    }
}

/// Handles every worker of a run shares
#[derive(Debug)]
pub struct WorkerContext {
    /// HTTP client (auth and default headers attached)
    pub client: HttpClient,
    /// Process-wide rate limiter
    pub limiter: RateLimiter,
    /// Retry schedule
    pub backoff: BackoffPolicy,
    /// Result sink
    pub emitter: Arc<ResultEmitter>,
    /// Raw wire dump sink, when enabled
    pub wire: Option<Arc<WireSink>>,
    /// Counters
    pub stats: Arc<RunStats>,
    /// Cancelled on the first fatal error
    pub token: CancellationToken,
    /// Behaviour switches
    pub config: WorkerConfig,
}

/// Live counters for a run, updated concurrently by workers
#[derive(Debug, Default)]
pub struct RunStats {
    records: AtomicU64,
    seeds: AtomicU64,
    requests: AtomicU64,
    retries: AtomicU64,
    pages: AtomicU64,
    emitted: AtomicU64,
    dropped: AtomicU64,
}

impl RunStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an input record
    pub fn add_record(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an admitted seed
    pub fn add_seed(&self) {
        self.seeds.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a physical request
    pub fn add_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a retryable response
    pub fn add_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a successful page
    pub fn add_page(&self) {
        self.pages.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an emitted result
    pub fn add_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a filtered-out result
    pub fn add_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records: self.records.load(Ordering::Relaxed),
            seeds: self.seeds.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            pages: self.pages.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Statistics from a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Input records decoded
    pub records: u64,
    /// Seeds admitted
    pub seeds: u64,
    /// Physical requests sent
    pub requests: u64,
    /// Retryable responses received
    pub retries: u64,
    /// 200 pages processed
    pub pages: u64,
    /// Results written
    pub emitted: u64,
    /// Results dropped by the error filter
    pub dropped: u64,
}
