//! Configuration for the request controller.

use std::time::Duration;

use crate::error::{NetworkError, Result};

/// Inactivity timeout applied to every request unless configured otherwise.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_millis(3000);

/// `Content-Type` sent with every request unless configured otherwise.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Per-request defaults applied by a [`RequestController`](super::RequestController).
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Inactivity timeout handed to the transport. `None` disables it.
    pub transfer_timeout: Option<Duration>,
    /// `Content-Type` header set on every request, GET included. Caller
    /// supplied headers never override it.
    pub content_type: http::HeaderValue,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            transfer_timeout: Some(DEFAULT_TRANSFER_TIMEOUT),
            content_type: http::HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
        }
    }
}

impl ControllerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transfer timeout.
    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = Some(timeout);
        self
    }

    /// Disable the transfer timeout.
    pub fn no_transfer_timeout(mut self) -> Self {
        self.transfer_timeout = None;
        self
    }

    /// Set the `Content-Type` sent with every request.
    pub fn content_type(mut self, value: impl TryInto<http::HeaderValue>) -> Result<Self> {
        self.content_type = value
            .try_into()
            .map_err(|_| NetworkError::InvalidHeader("Invalid content type".to_string()))?;
        Ok(self)
    }
}
