//! HTTP client for list endpoints
//!
//! A thin wrapper over reqwest that:
//! - Applies default headers (billing project, bearer credential, user agent)
//! - Builds one GET request per page
//! - Reads the full response body so callers can classify and decode it
//!
//! Retry and rate limiting are driven by the pagination worker, one
//! physical attempt at a time.

use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, StatusCode, Version};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Header carrying the billing / quota project identifier
pub const BILLING_PROJECT_HEADER: &str = "x-goog-user-project";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout (None = wait indefinitely)
    pub timeout: Option<Duration>,
    /// Billing project sent with every request
    pub billing_project: Option<String>,
    /// Bearer credential sent with every request
    pub access_token: Option<String>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(60)),
            billing_project: None,
            access_token: None,
            default_headers: HashMap::new(),
            user_agent: format!("listwalk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the billing project
    pub fn billing_project(mut self, project: impl Into<String>) -> Self {
        self.config.billing_project = Some(project.into());
        self
    }

    /// Set the bearer credential
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Status code
    pub status: StatusCode,
    /// Protocol version
    pub version: Version,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl RawResponse {
    /// Decode the body as JSON
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::decode(format!(
                "Failed to parse JSON body (HTTP {}): {e}",
                self.status.as_u16()
            ))
        })
    }
}

/// HTTP client shared by all workers
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    headers: HeaderMap,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let headers = default_headers(&config)?;

        Ok(Self {
            client,
            config,
            headers,
        })
    }

    /// Build a GET request for a page URL with the default headers applied
    pub fn build_get(&self, url: &Url) -> Result<Request> {
        let request = self
            .client
            .request(Method::GET, url.clone())
            .headers(self.headers.clone())
            .build()?;
        Ok(request)
    }

    /// Send one request and read its body
    pub async fn execute(&self, request: Request) -> Result<RawResponse> {
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.client.execute(request).await?;
        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        Ok(RawResponse {
            status,
            version,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.config.timeout)
            .field("billing_project", &self.config.billing_project)
            .field("has_access_token", &self.config.access_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Collect the headers every request carries
fn default_headers(config: &HttpClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (key, value) in &config.default_headers {
        headers.insert(parse_header_name(key)?, parse_header_value(key, value)?);
    }

    if let Some(project) = &config.billing_project {
        headers.insert(
            HeaderName::from_static(BILLING_PROJECT_HEADER),
            parse_header_value(BILLING_PROJECT_HEADER, project)?,
        );
    }

    if let Some(token) = &config.access_token {
        let mut value = parse_header_value("authorization", &format!("Bearer {token}"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn parse_header_name(key: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(key.as_bytes())
        .map_err(|e| Error::invalid_value(key, format!("invalid header name: {e}")))
}

fn parse_header_value(key: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::invalid_value(key, format!("invalid header value: {e}")))
}
