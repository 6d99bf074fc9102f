//! Core primitives for Tether.
//!
//! This crate provides the observer building blocks the request controller
//! exposes to an embedding application:
//!
//! - **Signal/Slot System**: Type-safe notifications ([`Signal`])
//! - **Property System**: Change-detecting values ([`Property`])
//! - **Logging**: `tracing` target names ([`logging::targets`])
//!
//! # Example
//!
//! ```
//! use tether_core::{Property, Signal};
//!
//! let value = Property::new(0);
//! let value_changed = Signal::<i32>::new();
//!
//! value_changed.connect(|value| println!("Value changed to: {}", value));
//!
//! if value.set(42) {
//!     value_changed.emit(42);
//! }
//! ```

pub mod logging;
pub mod property;
pub mod signal;

pub use property::Property;
pub use signal::{ConnectionId, Signal};
