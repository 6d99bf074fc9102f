//! Shared `reqwest` client used by [`HttpTransport`](super::HttpTransport).
//!
//! Per-request concerns (headers, transfer timeout) travel in the
//! [`RequestDescriptor`](crate::transport::RequestDescriptor); only
//! connection-level settings live here.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{NetworkError, Result};

/// Time allowed to establish a connection unless configured otherwise.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection-level settings for an [`HttpClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Limit for establishing a connection. `None` leaves it to the
    /// descriptor's transfer timeout.
    pub connect_timeout: Option<Duration>,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            user_agent: format!("Tether/{} (Rust)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Disable the connect timeout.
    pub fn no_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

struct HttpClientInner {
    client: reqwest::Client,
    config: HttpClientConfig,
}

/// A configured HTTP client.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

impl HttpClient {
    /// Create a client with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a client from `config`.
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| NetworkError::ClientBuild(e.to_string()))?;

        tracing::debug!(target: "tether_net::transport", ?config, "http client ready");
        Ok(Self {
            inner: Arc::new(HttpClientInner { client, config }),
        })
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }

    pub(crate) fn reqwest_client(&self) -> &reqwest::Client {
        &self.inner.client
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.inner.config)
            .finish()
    }
}
