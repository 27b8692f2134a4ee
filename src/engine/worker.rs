//! Pagination worker
//!
//! Drives one seed through `request -> classify -> {retry, paginate, done}`
//! and produces at most one [`SeedOutput`].

use super::types::WorkerContext;
use crate::error::{Error, Result};
use crate::http::{dump_request, dump_response, RawResponse};
use crate::pagination::{CursorPaginator, NextPage, PaginationState};
use crate::types::{Seed, SeedOutput};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// How a response status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200, continue with pagination
    Success,
    /// 429, back off and retry
    RateLimited,
    /// Other 4xx, terminal but not fatal
    ClientError,
    /// Everything else (5xx, 3xx, other 2xx), back off and retry
    Retryable,
}

/// Classify a response status
pub fn classify(status: StatusCode) -> StatusClass {
    if status == StatusCode::OK {
        StatusClass::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        StatusClass::RateLimited
    } else if status.is_client_error() {
        StatusClass::ClientError
    } else {
        StatusClass::Retryable
    }
}

/// Fetches every page of one seed
#[derive(Debug)]
pub struct PaginationWorker {
    ctx: Arc<WorkerContext>,
    seed: Seed,
    paginator: CursorPaginator,
}

impl PaginationWorker {
    /// Create a worker for a seed
    pub fn new(ctx: Arc<WorkerContext>, seed: Seed, collection_field: Option<String>) -> Self {
        Self {
            ctx,
            seed,
            paginator: CursorPaginator::new(collection_field),
        }
    }

    /// Run to completion and hand the result to the emitter
    pub async fn run_and_emit(self) -> Result<()> {
        let ctx = self.ctx.clone();
        if let Some(output) = self.run().await? {
            ctx.emitter.emit(&output)?;
            ctx.stats.add_emitted();
        }
        Ok(())
    }

    /// Run to completion
    ///
    /// Returns `None` in dry-run mode and for filtered error responses.
    pub async fn run(self) -> Result<Option<SeedOutput>> {
        let seq = self.seed.sequence;
        let mut state = PaginationState::new();

        loop {
            let url = self.paginator.page_url(&self.seed.url, &state.cursor)?;

            let config = self.ctx.config;
            if !config.execute || config.verbose {
                info!("do url[{seq}]: GET {url}");
            }
            if !config.execute {
                return Ok(None);
            }

            let response = self.fetch(&url).await?;
            let body = response.json()?;

            if response.status != StatusCode::OK {
                if config.filter_error {
                    debug!("drop url[{seq}]: HTTP {}", response.status.as_u16());
                    self.ctx.stats.add_dropped();
                    return Ok(None);
                }
                return Ok(Some(SeedOutput::new(self.seed.input, body)));
            }

            self.ctx.stats.add_page();
            if !self.paginator.is_paginating() {
                return Ok(Some(SeedOutput::new(self.seed.input, body)));
            }

            match self.paginator.process_page(&body, &mut state)? {
                NextPage::Continue(_) => {}
                NextPage::Done => {
                    debug!(
                        "done url[{seq}]: {} pages, {} items",
                        state.pages,
                        state.collection.len()
                    );
                    let response = self.paginator.finish(state);
                    return Ok(Some(SeedOutput::new(self.seed.input, response)));
                }
            }
        }
    }

    /// Request one page, retrying per the backoff policy
    async fn fetch(&self, url: &Url) -> Result<RawResponse> {
        let seq = self.seed.sequence;
        let mut backoff = self.ctx.backoff.start(&self.ctx.token);

        while backoff.should_continue().await {
            let response = self.attempt(url).await?;

            match classify(response.status) {
                StatusClass::Success => return Ok(response),
                StatusClass::ClientError => {
                    warn!("error url[{seq}]: GET {url}, reason: {}", response.status);
                    return Ok(response);
                }
                StatusClass::RateLimited | StatusClass::Retryable => {
                    warn!(
                        "retry url[{seq}]: GET {url}, reason: {}, attempt {}",
                        response.status,
                        backoff.attempts()
                    );
                    self.ctx.stats.add_retry();
                }
            }
        }

        if self.ctx.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Err(Error::RetryBudgetExhausted {
            url: url.to_string(),
            attempts: backoff.attempts(),
        })
    }

    /// One physical request: rate limit, send, read, dump
    async fn attempt(&self, url: &Url) -> Result<RawResponse> {
        let ctx = &self.ctx;
        let request = ctx.client.build_get(url)?;

        let mut dump = ctx.wire.as_ref().map(|_| Vec::new());
        if let Some(buf) = dump.as_mut() {
            dump_request(&request, buf);
        }

        tokio::select! {
            biased;
            () = ctx.token.cancelled() => return Err(Error::Cancelled),
            () = ctx.limiter.take() => {}
        }
        ctx.stats.add_request();

        let result = tokio::select! {
            biased;
            () = ctx.token.cancelled() => Err(Error::Cancelled),
            response = ctx.client.execute(request) => response,
        };

        if let (Some(sink), Some(mut buf)) = (&ctx.wire, dump) {
            if let Ok(response) = &result {
                dump_response(response, &mut buf);
            }
            sink.flush_exchange(&buf)?;
        }

        result
    }
}
