//! The transport seam between the request controller and an HTTP client.
//!
//! A [`Transport`] starts operations; each operation is represented by a
//! linked pair created with [`operation_channel`]:
//!
//! - the [`OperationHandle`] stays with the controller and is used to read
//!   buffered bytes, query activity and cancel;
//! - the [`OperationSink`] goes to the transport's I/O task, which pushes
//!   bytes and reports the terminal outcome.
//!
//! Events flow from sink to controller over an unbounded channel, in order:
//! an optional [`TransportEvent::Metadata`], zero or more
//! [`TransportEvent::DataAvailable`], then exactly one of
//! [`TransportEvent::Finished`] or [`TransportEvent::Failed`]. Nothing is
//! sent after a cancellation.
//!
//! # Example
//!
//! ```
//! use tether_net::transport::{operation_channel, TransportEvent};
//!
//! let (handle, sink, mut events) = operation_channel();
//! sink.write(&b"hello"[..]);
//! sink.finish();
//!
//! assert!(matches!(events.try_recv(), Ok(TransportEvent::DataAvailable)));
//! assert!(matches!(events.try_recv(), Ok(TransportEvent::Finished)));
//! assert_eq!(&handle.read_available()[..], b"hello");
//! assert!(!handle.is_active());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};

use crate::error::TransportError;

/// Unique identifier for a transport operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a transport needs to issue one request.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    /// The absolute request URL.
    pub url: String,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Inactivity timeout: the operation fails if no progress is made for
    /// this long. `None` disables it.
    pub transfer_timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Create a descriptor with no headers and no timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: http::HeaderMap::new(),
            transfer_timeout: None,
        }
    }

    /// Set the inactivity timeout.
    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = Some(timeout);
        self
    }

    /// Insert a header, replacing any existing value for the name.
    pub fn header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Notification sent from a transport to the owner of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// Response status and announced body length are known.
    Metadata {
        /// The HTTP status code.
        status: u16,
        /// The `Content-Length`, if announced.
        content_length: Option<u64>,
    },
    /// New bytes can be read with [`OperationHandle::read_available`].
    DataAvailable,
    /// The response was received completely.
    Finished,
    /// The operation failed.
    Failed(TransportError),
}

impl TransportEvent {
    /// Whether this event ends the operation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_))
    }
}

/// State shared between an [`OperationHandle`] and its [`OperationSink`].
struct OperationShared {
    id: OperationId,
    pending: Mutex<BytesMut>,
    active: AtomicBool,
    cancelled: AtomicBool,
    cancel_notify: Notify,
}

/// Controller-side view of an in-flight operation.
pub struct OperationHandle {
    shared: Arc<OperationShared>,
}

impl OperationHandle {
    /// The operation's identifier.
    pub fn id(&self) -> OperationId {
        self.shared.id
    }

    /// Whether the operation is still running (not finished, failed or cancelled).
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Take every byte received so far that has not been read yet.
    pub fn read_available(&self) -> Bytes {
        self.shared.pending.lock().split().freeze()
    }

    /// Cancel the operation.
    ///
    /// Returns `true` if the operation was active and is now cancelled,
    /// `false` if it had already ended or was already cancelled.
    pub fn cancel(&self) -> bool {
        if !self.shared.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.cancel_notify.notify_one();
        true
    }
}

impl fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("id", &self.shared.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Transport-side writer for an operation.
pub struct OperationSink {
    shared: Arc<OperationShared>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl OperationSink {
    /// The operation's identifier.
    pub fn id(&self) -> OperationId {
        self.shared.id
    }

    /// Whether the owner cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the owner cancels the operation.
    ///
    /// Never resolves if the operation ends any other way.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.shared.cancel_notify.notified().await;
    }

    /// Report the response status and announced length.
    pub fn set_metadata(&self, status: u16, content_length: Option<u64>) {
        if self.is_open() {
            self.send(TransportEvent::Metadata {
                status,
                content_length,
            });
        }
    }

    /// Buffer received bytes and notify the owner.
    ///
    /// Returns `false` (and drops the bytes) if the operation has already
    /// ended or was cancelled.
    pub fn write(&self, data: impl AsRef<[u8]>) -> bool {
        if !self.is_open() {
            return false;
        }
        let data = data.as_ref();
        if data.is_empty() {
            return true;
        }
        self.shared.pending.lock().extend_from_slice(data);
        self.send(TransportEvent::DataAvailable);
        true
    }

    /// Report successful completion.
    pub fn finish(&self) {
        if self.shared.active.swap(false, Ordering::SeqCst) {
            self.send(TransportEvent::Finished);
        }
    }

    /// Report failure.
    pub fn fail(&self, error: impl Into<TransportError>) {
        if self.shared.active.swap(false, Ordering::SeqCst) {
            self.send(TransportEvent::Failed(error.into()));
        }
    }

    fn is_open(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    fn send(&self, event: TransportEvent) {
        // The receiver is gone once the owner stops listening.
        let _ = self.events.send(event);
    }
}

impl fmt::Debug for OperationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSink")
            .field("id", &self.shared.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Create the linked handle, sink and event receiver for a new operation.
pub fn operation_channel() -> (
    OperationHandle,
    OperationSink,
    mpsc::UnboundedReceiver<TransportEvent>,
) {
    let shared = Arc::new(OperationShared {
        id: OperationId::new(),
        pending: Mutex::new(BytesMut::new()),
        active: AtomicBool::new(true),
        cancelled: AtomicBool::new(false),
        cancel_notify: Notify::new(),
    });
    let (tx, rx) = mpsc::unbounded_channel();
    (
        OperationHandle {
            shared: shared.clone(),
        },
        OperationSink { shared, events: tx },
        rx,
    )
}

/// An operation returned by a [`Transport`].
#[derive(Debug)]
pub struct PendingOperation {
    /// Handle used to read bytes and cancel.
    pub handle: OperationHandle,
    /// Events reported by the transport for this operation.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl PendingOperation {
    /// Assemble from an [`operation_channel`] handle and receiver.
    pub fn new(
        handle: OperationHandle,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self { handle, events }
    }
}

/// An HTTP client able to run GET and POST operations.
///
/// Implementations must not block: they start the I/O in the background and
/// return immediately, reporting progress through the operation's sink.
pub trait Transport: Send + Sync {
    /// Start a GET request.
    fn get(&self, request: RequestDescriptor) -> PendingOperation;

    /// Start a POST request with an opaque body.
    fn post(&self, request: RequestDescriptor, body: Bytes) -> PendingOperation;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(&self, request: RequestDescriptor) -> PendingOperation {
        (**self).get(request)
    }

    fn post(&self, request: RequestDescriptor, body: Bytes) -> PendingOperation {
        (**self).post(request, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorCode;

    #[test]
    fn test_operation_ids_increase() {
        let (a, _, _) = operation_channel();
        let (b, _, _) = operation_channel();
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_read_available_drains() {
        let (handle, sink, _events) = operation_channel();
        assert!(sink.write(b"abc"));
        assert!(sink.write(b"de"));
        assert_eq!(&handle.read_available()[..], b"abcde");
        assert!(handle.read_available().is_empty());
    }

    #[test]
    fn test_single_terminal_event() {
        let (handle, sink, mut events) = operation_channel();
        sink.fail(TransportError::new(TransportErrorCode::Timeout, "slow"));
        sink.finish();
        assert!(!sink.write(b"late"));

        assert!(matches!(events.try_recv(), Ok(TransportEvent::Failed(_))));
        assert!(events.try_recv().is_err());
        assert!(handle.read_available().is_empty());
    }

    #[test]
    fn test_cancel_stops_events() {
        let (handle, sink, mut events) = operation_channel();
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(!handle.is_active());
        assert!(sink.is_cancelled());

        assert!(!sink.write(b"ignored"));
        sink.finish();
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_cancel_after_finish_is_noop() {
        let (handle, sink, _events) = operation_channel();
        sink.finish();
        assert!(!handle.cancel());
        assert!(!sink.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let (handle, sink, _events) = operation_channel();
        let waiter = tokio::spawn(async move { sink.cancelled().await });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation not observed")
            .unwrap();
    }

    #[test]
    fn test_descriptor_builder() {
        let request = RequestDescriptor::new("https://example.com")
            .transfer_timeout(Duration::from_millis(250))
            .header(
                http::header::ACCEPT,
                http::HeaderValue::from_static("text/plain"),
            );
        assert_eq!(request.transfer_timeout, Some(Duration::from_millis(250)));
        assert_eq!(request.headers.len(), 1);
    }
}
