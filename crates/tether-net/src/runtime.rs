//! Runtime management for async operations.
//!
//! Transports and the request controller spawn their background work through
//! this module. When called from inside a tokio runtime the ambient runtime is
//! used; otherwise a small global multi-threaded runtime is created on first
//! use, so embedding applications without their own runtime still work.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Handle, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Initialize the global fallback runtime.
///
/// Calling this is optional; the runtime is created lazily otherwise.
///
/// # Panics
///
/// Panics if the operating system refuses to create the runtime's threads.
pub fn init() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tracing::debug!(target: "tether_net::runtime", "starting fallback tokio runtime");
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("tether-net")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Handle to the runtime background work is spawned on.
pub fn handle() -> Handle {
    Handle::try_current().unwrap_or_else(|_| init().handle().clone())
}

/// Spawn a future on the ambient runtime, or the global fallback runtime.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    handle().spawn(future)
}
