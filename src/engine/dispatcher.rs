//! Bounded task dispatcher
//!
//! Admission blocks the caller until a capacity permit is free, so input is
//! never read faster than workers can take it. The first failing task
//! cancels the shared token and its error becomes the run's error.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// First error seen across all tasks
type FirstError = Arc<Mutex<Option<Error>>>;

/// Runs admitted work with at most `parallelism` tasks in flight
#[derive(Debug)]
pub struct Dispatcher {
    permits: Arc<Semaphore>,
    token: CancellationToken,
    tasks: JoinSet<()>,
    first_error: FirstError,
}

impl Dispatcher {
    /// Create a dispatcher with a fixed capacity
    ///
    /// The capacity is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(parallelism: usize, token: CancellationToken) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(parallelism.clamp(1, Semaphore::MAX_PERMITS))),
            token,
            tasks: JoinSet::new(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Tasks spawned and not yet reaped
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for capacity, then spawn `work`
    ///
    /// Returns `Error::Cancelled` once the run has been cancelled; nothing
    /// is spawned in that case.
    pub async fn admit<F>(&mut self, work: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let permit = tokio::select! {
            biased;
            () = self.token.cancelled() => return Err(Error::Cancelled),
            permit = self.permits.clone().acquire_owned() => {
                permit.map_err(|_| Error::Cancelled)?
            }
        };

        let token = self.token.clone();
        let first_error = self.first_error.clone();
        self.tasks.spawn(async move {
            if let Err(e) = work.await {
                record(&first_error, &token, e);
            }
            drop(permit);
        });

        self.reap();
        Ok(())
    }

    /// Record an error from outside a task and cancel the run
    pub fn fail(&self, error: Error) {
        record(&self.first_error, &self.token, error);
    }

    /// Wait for every task and return the first error, if any
    pub async fn finish(mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                self.fail(Error::TaskJoin {
                    message: e.to_string(),
                });
            }
        }

        let first = match self.first_error.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Drop finished tasks so the join set does not grow with the input
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                self.fail(Error::TaskJoin {
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Keep the first real error; a cancellation never replaces one
fn record(slot: &FirstError, token: &CancellationToken, error: Error) {
    if let Ok(mut guard) = slot.lock() {
        let replaces = match guard.as_ref() {
            None => true,
            Some(existing) => existing.is_cancelled() && !error.is_cancelled(),
        };
        if replaces {
            if !error.is_cancelled() {
                error!(transport = error.is_fatal_transport(), "{error}");
            }
            *guard = Some(error);
        } else {
            debug!("suppressed after first error: {error}");
        }
    }
    token.cancel();
}
