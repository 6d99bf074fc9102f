//! Networking module for Tether.
//!
//! This crate provides a single-request HTTP controller for applications that
//! want to observe one outstanding request through signals:
//!
//! - **Request Controller**: GET/POST with a small observable lifecycle
//! - **Transport Seam**: a trait separating the controller from the HTTP stack
//! - **HTTP Transport**: a `reqwest`-backed transport with transfer timeouts
//!
//! # Request Controller
//!
//! ```ignore
//! use tether_net::{RequestController, RequestState};
//!
//! let controller = RequestController::new()?;
//!
//! controller.finished().connect(|body| {
//!     println!("received {} bytes", body.len());
//! });
//! controller.error_occurred().connect(|message| {
//!     eprintln!("request failed: {}", message);
//! });
//!
//! // Start request (returns immediately)
//! controller.start_post(
//!     "https://api.example.com/items",
//!     r#"{"name":"x"}"#,
//!     [("Authorization", "Bearer token123")],
//! );
//!
//! // Cancel if needed
//! controller.abort();
//! assert_eq!(controller.state(), RequestState::None);
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! let client = HttpClient::with_config(
//!     HttpClientConfig::new()
//!         .connect_timeout(Duration::from_secs(5))
//!         .user_agent("MyApp/1.0"),
//! )?;
//!
//! let controller = RequestController::with_transport(
//!     HttpTransport::from_client(client),
//!     ControllerConfig::new().transfer_timeout(Duration::from_secs(10)),
//! );
//! ```
//!
//! # Custom Transports
//!
//! Anything implementing [`Transport`] can drive a controller, which is how
//! the controller is tested without a network. See [`transport`] for the
//! event protocol.

pub mod controller;
mod error;
pub mod http;
pub mod progress;
pub mod runtime;
pub mod transport;

pub use error::{NetworkError, Result, TransportError, TransportErrorCode};

// Re-export commonly used types at the crate root
pub use controller::{
    ControllerConfig, DEFAULT_CONTENT_TYPE, DEFAULT_TRANSFER_TIMEOUT, RequestController,
    RequestState,
};
pub use http::{HttpClient, HttpClientConfig, HttpTransport};
pub use progress::TransferProgress;
pub use transport::{
    OperationHandle, OperationId, OperationSink, PendingOperation, RequestDescriptor, Transport,
    TransportEvent, operation_channel,
};
