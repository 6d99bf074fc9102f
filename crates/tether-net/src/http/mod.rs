//! HTTP transport for Tether.
//!
//! [`HttpTransport`] implements [`crate::Transport`] on top of `reqwest`,
//! sharing one [`HttpClient`] configured through [`HttpClientConfig`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tether_net::http::{HttpClient, HttpClientConfig, HttpTransport};
//!
//! let client = HttpClient::with_config(
//!     HttpClientConfig::new()
//!         .connect_timeout(Duration::from_secs(5))
//!         .user_agent("MyApp/1.0"),
//! )?;
//! let transport = HttpTransport::from_client(client);
//! ```

mod client;
mod transport;

pub use client::{DEFAULT_CONNECT_TIMEOUT, HttpClient, HttpClientConfig};
pub use transport::HttpTransport;
