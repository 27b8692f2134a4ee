//! HTTP client module
//!
//! Provides the HTTP client, the shared rate limiter and the backoff policy
//! used by pagination workers.
//!
//! # Features
//!
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff**: Exponential backoff with jitter, cancellable waits
//! - **Wire Dumps**: Optional raw request/response logging

mod backoff;
mod client;
mod dump;
mod rate_limit;

pub use backoff::{BackoffController, BackoffPolicy};
pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, RawResponse, BILLING_PROJECT_HEADER,
};
pub use dump::{dump_request, dump_response, WireSink};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
