//! Logging facilities for Tether.
//!
//! Tether uses the `tracing` crate for instrumentation. To see logs, install
//! a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("tether_net=debug")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core primitives target.
    pub const CORE: &str = "tether_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "tether_core::signal";
}
