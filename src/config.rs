//! Run configuration
//!
//! A [`RunConfig`] can be loaded from a YAML file and is then overridden
//! by command-line flags. Every field has a default, so an empty file is a
//! valid configuration.

use crate::error::{Error, Result};
use crate::expand::{
    infer_collection_field, IdentityExpander, JsonPathExpander, SeedExpander, TemplateExpander,
};
use crate::http::{BackoffPolicy, HttpClientConfig, RateLimiterConfig};
use crate::types::{InputFormat, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// Collection Selection
// ============================================================================

/// How the collection field of a seed is chosen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CollectionSelector {
    /// Return raw bodies, no page merging
    #[default]
    None,
    /// Merge this field across pages
    Field(String),
    /// Use the last path segment of each seed URL
    FromUrl,
}

impl CollectionSelector {
    /// Resolve the collection field for one seed URL
    pub fn resolve(&self, url: &str) -> Result<Option<String>> {
        match self {
            Self::None => Ok(None),
            Self::Field(name) => Ok(Some(name.clone())),
            Self::FromUrl => infer_collection_field(url),
        }
    }
}

// ============================================================================
// Run Config
// ============================================================================

/// Complete configuration for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// URL template rendered against each input record
    pub url: Option<String>,

    /// JSONPath selecting seed URLs from each input record
    pub url_path: Option<String>,

    /// Billing / quota project sent as a request header
    pub billing_project: Option<String>,

    /// Collection field merged across pages
    pub collection: Option<String>,

    /// Infer the collection field from each seed URL
    pub auto_collection: bool,

    /// Maximum seeds in flight
    pub parallelism: usize,

    /// Requests per minute across all workers (0 = unlimited)
    pub rate_limit_per_minute: u32,

    /// Actually send requests (otherwise log them only)
    pub execute: bool,

    /// Log every request
    pub verbose: bool,

    /// Dump raw requests and responses to stderr
    pub log_http: bool,

    /// Input framing
    pub input_format: InputFormat,

    /// Output encoding
    pub output_format: OutputFormat,

    /// Drop terminal non-200 responses instead of emitting them
    pub filter_error: bool,

    /// Retries per request (0 = unlimited)
    pub max_retries: u32,

    /// Per-request timeout in seconds (0 = none)
    pub timeout_secs: u64,

    /// Bearer credential
    #[serde(skip_serializing)]
    pub access_token: Option<String>,

    /// User agent override
    pub user_agent: Option<String>,

    /// Delay before the first retry
    pub initial_backoff_ms: u64,

    /// Ceiling for retry delays
    pub max_backoff_ms: u64,

    /// Multiplicative jitter applied to retry delays
    pub backoff_jitter: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            url: None,
            url_path: None,
            billing_project: None,
            collection: None,
            auto_collection: false,
            parallelism: 1,
            rate_limit_per_minute: 0,
            execute: false,
            verbose: false,
            log_http: false,
            input_format: InputFormat::Json,
            output_format: OutputFormat::Json,
            filter_error: false,
            max_retries: 0,
            timeout_secs: 60,
            access_token: None,
            user_agent: None,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            backoff_jitter: 0.1,
        }
    }
}

impl RunConfig {
    /// Load a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse a config from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reject inconsistent settings before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.auto_collection && self.collection.is_some() {
            return Err(Error::config(
                "--auto-collection and --collection are exclusive",
            ));
        }
        if self.url.is_some() && self.url_path.is_some() {
            return Err(Error::config("--url and --url-path are exclusive"));
        }
        if self.parallelism == 0 {
            return Err(Error::invalid_value("parallelism", "must be at least 1"));
        }
        if self.parallelism > Semaphore::MAX_PERMITS {
            return Err(Error::invalid_value(
                "parallelism",
                format!("must not exceed {}", Semaphore::MAX_PERMITS),
            ));
        }
        if !(0.0..1.0).contains(&self.backoff_jitter) {
            return Err(Error::invalid_value(
                "backoff_jitter",
                "must be in [0, 1)",
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::invalid_value(
                "initial_backoff_ms",
                "must not exceed max_backoff_ms",
            ));
        }
        if matches!(&self.collection, Some(c) if c.is_empty()) {
            return Err(Error::invalid_value("collection", "must not be empty"));
        }
        Ok(())
    }

    /// How collection fields are chosen
    pub fn collection_selector(&self) -> CollectionSelector {
        match (&self.collection, self.auto_collection) {
            (Some(name), _) => CollectionSelector::Field(name.clone()),
            (None, true) => CollectionSelector::FromUrl,
            (None, false) => CollectionSelector::None,
        }
    }

    /// Build the seed expander named by the config
    pub fn seed_expander(&self) -> Result<Box<dyn SeedExpander>> {
        match (&self.url, &self.url_path) {
            (Some(_), Some(_)) => Err(Error::config("--url and --url-path are exclusive")),
            (Some(template), None) => Ok(Box::new(TemplateExpander::new(template.clone())?)),
            (None, Some(path)) => Ok(Box::new(JsonPathExpander::new(path)?)),
            (None, None) => Ok(Box::new(IdentityExpander)),
        }
    }

    /// Backoff schedule for retried requests
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::exponential(
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
            self.backoff_jitter,
        )
        .with_max_retries(self.max_retries)
    }

    /// Shared rate limiter settings
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig::per_minute(self.rate_limit_per_minute)
    }

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder().timeout(self.timeout());
        if let Some(project) = &self.billing_project {
            builder = builder.billing_project(project);
        }
        if let Some(token) = &self.access_token {
            builder = builder.access_token(token);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        builder.build()
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
