// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]

//! # listwalk
//!
//! Fan-out pagination over list-style HTTP APIs.
//!
//! Input records are expanded into seed URLs. Each seed is fetched by a
//! worker that follows `nextPageToken` cursors, merges the configured
//! collection field across pages and emits one `{input, response}` record.
//!
//! ## Features
//!
//! - **Seed expansion**: URL templates, JSONPath selection, or raw URLs
//! - **Input framing**: JSON stream, YAML document stream, raw lines
//! - **Bounded concurrency**: capacity pool with fail-fast cancellation
//! - **Rate limiting**: process-wide requests-per-minute budget
//! - **Retry**: exponential backoff with jitter on 429 and 5xx
//! - **Output**: JSON lines or YAML documents
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use listwalk::config::RunConfig;
//! use listwalk::engine::Engine;
//! use listwalk::output::ResultEmitter;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> listwalk::Result<()> {
//!     let config = RunConfig {
//!         url: Some("https://compute.googleapis.com/compute/v1/projects/{{ project }}/zones".into()),
//!         auto_collection: true,
//!         execute: true,
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!
//!     let emitter = Arc::new(ResultEmitter::new(
//!         config.output_format,
//!         Box::new(std::io::stdout()),
//!     ));
//!     let engine = Engine::new(&config, emitter, None, Default::default())?;
//!     let (tx, rx) = tokio::sync::mpsc::channel(1);
//!     tx.send(Ok(serde_json::json!({"project": "my-project"}))).await.ok();
//!     drop(tx);
//!
//!     engine.run(rx, config.seed_expander()?.as_ref()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌────────────┐   ┌──────────────────┐
//! │  decode    │──▶│  expand  │──▶│ Dispatcher │──▶│ PaginationWorker │
//! │ (thread)   │   │ (seeds)  │   │ (permits)  │   │  per seed        │
//! └────────────┘   └──────────┘   └────────────┘   └────────┬─────────┘
//!                                                          │
//!                  ┌──────────────┬──────────────┬──────────┴───┐
//!                  │ RateLimiter  │ Backoff      │ ResultEmitter│
//!                  │ (shared)     │ (per request)│ (mutex)      │
//!                  └──────────────┴──────────────┴──────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client, backoff, rate limiting and wire dumps
pub mod http;

/// Cursor pagination
pub mod pagination;

/// Input stream decoders (JSON, YAML, raw lines)
pub mod decode;

/// Result output
pub mod output;

/// Main execution engine
pub mod engine;

/// Run configuration
pub mod config;

/// Seed URL expansion
pub mod expand;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::RunConfig;
pub use engine::{Engine, StatsSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
