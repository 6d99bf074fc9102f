//! Single-request controller with an observable lifecycle.
//!
//! A [`RequestController`] issues at most one GET or POST at a time through a
//! [`Transport`], buffers the streamed response, and reports progress through
//! signals:
//!
//! ```text
//! None ----start_get/start_post----> Pending
//! Pending ----data available-------> Processing
//! Processing ----more data---------> Processing
//! Pending|Processing ----finished--> Completed
//! Pending|Processing ----error-----> Error
//! (any) ----abort/reset_status-----> None
//! ```
//!
//! Commands (`start_*`, `abort`, `reset_status`) and transport events share a
//! single transition path; signals are emitted after the controller's lock is
//! released, so slots may call back into the controller.
//!
//! Events are tagged with the operation that produced them. Any event for an
//! operation that is no longer the active one (aborted, reset or already
//! finished) is discarded.
//!
//! # Example
//!
//! ```ignore
//! use tether_net::{RequestController, RequestState};
//!
//! let controller = RequestController::new()?;
//!
//! controller.state_changed().connect(|state| println!("state: {state}"));
//! controller.finished().connect(|body| println!("received {} bytes", body.len()));
//! controller.error_occurred().connect(|message| eprintln!("{message}"));
//!
//! assert!(controller.start_get("https://api.example.com/data"));
//! // A second request is rejected while the first is outstanding.
//! assert!(!controller.start_get("https://api.example.com/other"));
//! ```

mod config;
mod state;

use std::sync::{Arc, Weak};

use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, ReentrantMutex};
use tether_core::{Property, Signal};
use tokio::sync::mpsc;

pub use config::{ControllerConfig, DEFAULT_CONTENT_TYPE, DEFAULT_TRANSFER_TIMEOUT};
pub use state::RequestState;

use crate::error::{Result, TransportError, TransportErrorCode};
use crate::http::HttpTransport;
use crate::progress::TransferProgress;
use crate::runtime;
use crate::transport::{
    OperationHandle, OperationId, PendingOperation, RequestDescriptor, Transport, TransportEvent,
};

/// Mutable request data. Always accessed under the controller lock.
struct ControllerInner {
    buffer: BytesMut,
    active: Option<OperationHandle>,
    status_code: Option<u16>,
    content_length: Option<u64>,
}

impl ControllerInner {
    /// Move every readable byte of the active operation into the buffer.
    fn drain_active(&mut self) -> usize {
        let Some(operation) = self.active.as_ref() else {
            return 0;
        };
        let data = operation.read_available();
        self.buffer.extend_from_slice(&data);
        data.len()
    }

    fn is_current(&self, id: OperationId) -> bool {
        self.active.as_ref().is_some_and(|op| op.id() == id)
    }
}

/// Signals collected under the lock and emitted once it is released.
#[derive(Default)]
struct Notifications {
    state_changes: Vec<(RequestState, RequestState)>,
    aborted: bool,
    progress: Option<TransferProgress>,
    finished: Option<Bytes>,
    error: Option<String>,
}

/// State shared between the controller and its event pumps.
///
/// Lock order: `emitting`, then `inner`. `emitting` is held from the first
/// transition until the resulting signals are delivered, so observers see
/// changes in the order they were applied. It is reentrant so slots can
/// call back into the controller.
struct ControllerShared {
    emitting: ReentrantMutex<()>,
    inner: Mutex<ControllerInner>,
    state: Property<RequestState>,
    state_changed: Signal<RequestState>,
    busy_changed: Signal<bool>,
    finished: Signal<Bytes>,
    error_occurred: Signal<String>,
    aborted: Signal<()>,
    download_progress: Signal<TransferProgress>,
}

impl ControllerShared {
    fn new() -> Self {
        Self {
            emitting: ReentrantMutex::new(()),
            inner: Mutex::new(ControllerInner {
                buffer: BytesMut::new(),
                active: None,
                status_code: None,
                content_length: None,
            }),
            state: Property::new(RequestState::None),
            state_changed: Signal::new(),
            busy_changed: Signal::new(),
            finished: Signal::new(),
            error_occurred: Signal::new(),
            aborted: Signal::new(),
            download_progress: Signal::new(),
        }
    }

    /// Move to `next` if the lifecycle allows it.
    ///
    /// Leaving the busy states releases the active operation without
    /// cancelling it, so `active` is `Some` exactly while busy.
    fn transition(
        &self,
        inner: &mut ControllerInner,
        next: RequestState,
        notes: &mut Notifications,
    ) {
        let current = self.state.get();
        if !current.can_transition_to(next) {
            tracing::warn!(
                target: "tether_net::controller",
                from = %current,
                to = %next,
                "ignoring invalid state transition"
            );
            return;
        }
        if !next.is_busy() {
            inner.active = None;
        }
        if let Some(previous) = self.state.replace(next) {
            tracing::trace!(target: "tether_net::controller", from = %previous, to = %next, "state changed");
            notes.state_changes.push((previous, next));
        }
    }

    fn deliver(&self, notes: Notifications) {
        for (previous, current) in notes.state_changes {
            self.state_changed.emit(current);
            if previous.is_busy() != current.is_busy() {
                self.busy_changed.emit(current.is_busy());
            }
        }
        if notes.aborted {
            self.aborted.emit(());
        }
        if let Some(progress) = notes.progress {
            self.download_progress.emit(progress);
        }
        if let Some(body) = notes.finished {
            self.finished.emit(body);
        }
        if let Some(message) = notes.error {
            self.error_occurred.emit(message);
        }
    }

    fn handle_event(&self, id: OperationId, event: TransportEvent) {
        let _emitting = self.emitting.lock();
        let mut notes = Notifications::default();
        {
            let mut inner = self.inner.lock();
            if !inner.is_current(id) {
                tracing::trace!(target: "tether_net::controller", %id, ?event, "discarding event for inactive operation");
                return;
            }

            match event {
                TransportEvent::Metadata {
                    status,
                    content_length,
                } => {
                    inner.status_code = Some(status);
                    inner.content_length = content_length;
                }
                TransportEvent::DataAvailable => self.on_data_available(&mut inner, &mut notes),
                TransportEvent::Finished => self.on_finished(&mut inner, &mut notes),
                TransportEvent::Failed(error) => {
                    self.on_error_occurred(&mut inner, error, &mut notes)
                }
            }
        }
        self.deliver(notes);
    }

    fn on_data_available(&self, inner: &mut ControllerInner, notes: &mut Notifications) {
        let received = inner.drain_active();
        self.transition(inner, RequestState::Processing, notes);
        if received > 0 {
            notes.progress = Some(TransferProgress {
                bytes_transferred: inner.buffer.len() as u64,
                total_bytes: inner.content_length,
            });
        }
    }

    fn on_finished(&self, inner: &mut ControllerInner, notes: &mut Notifications) {
        inner.drain_active();
        self.transition(inner, RequestState::Completed, notes);
        tracing::debug!(target: "tether_net::controller", bytes = inner.buffer.len(), "request completed");
        notes.finished = Some(Bytes::copy_from_slice(&inner.buffer));
    }

    fn on_error_occurred(
        &self,
        inner: &mut ControllerInner,
        error: TransportError,
        notes: &mut Notifications,
    ) {
        inner.drain_active();
        self.transition(inner, RequestState::Error, notes);
        tracing::warn!(target: "tether_net::controller", code = error.code.code(), %error, "request failed");
        notes.error = Some(error.to_string());
    }
}

/// Forward one operation's transport events into the controller.
async fn pump_events(
    shared: Weak<ControllerShared>,
    id: OperationId,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let terminal = event.is_terminal();
        shared.handle_event(id, event);
        if terminal {
            return;
        }
    }

    // The transport dropped its sink without a terminal event.
    if let Some(shared) = shared.upgrade() {
        shared.handle_event(
            id,
            TransportEvent::Failed(TransportError::new(
                TransportErrorCode::UnknownNetwork,
                "transport closed the operation without a result",
            )),
        );
    }
}

/// A controller that runs one HTTP request at a time.
///
/// # Signals
///
/// - [`state_changed`](Self::state_changed): the lifecycle state changed
/// - [`busy_changed`](Self::busy_changed): the derived busy flag flipped
/// - [`finished`](Self::finished): the full response body, once per request
/// - [`error_occurred`](Self::error_occurred): a message embedding the error code
/// - [`aborted`](Self::aborted): an active request was cancelled by [`abort`](Self::abort)
/// - [`download_progress`](Self::download_progress): bytes received so far
///
/// Dropping the controller cancels any active request.
pub struct RequestController {
    transport: Arc<dyn Transport>,
    config: ControllerConfig,
    shared: Arc<ControllerShared>,
}

impl RequestController {
    /// Create a controller over a default [`HttpTransport`].
    pub fn new() -> Result<Self> {
        Self::with_config(ControllerConfig::default())
    }

    /// Create a controller over a default [`HttpTransport`] with custom defaults.
    pub fn with_config(config: ControllerConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?, config))
    }

    /// Create a controller over any transport.
    pub fn with_transport(transport: impl Transport + 'static, config: ControllerConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            shared: Arc::new(ControllerShared::new()),
        }
    }

    /// The per-request defaults in use.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        self.shared.state.get()
    }

    /// Whether a request is outstanding (`Pending` or `Processing`).
    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Bytes received for the current (or most recent) request.
    pub fn buffer(&self) -> Bytes {
        Bytes::copy_from_slice(&self.shared.inner.lock().buffer)
    }

    /// HTTP status of the current (or most recent) response, once known.
    pub fn status_code(&self) -> Option<u16> {
        self.shared.inner.lock().status_code
    }

    /// Announced body length of the current (or most recent) response.
    pub fn content_length(&self) -> Option<u64> {
        self.shared.inner.lock().content_length
    }

    /// Start a GET request.
    ///
    /// Returns `false` without side effects if a request is already
    /// outstanding.
    pub fn start_get(&self, url: impl AsRef<str>) -> bool {
        self.start(url.as_ref(), None, std::iter::empty::<(&str, &str)>())
    }

    /// Start a POST request with an opaque body and extra headers.
    ///
    /// The configured `Content-Type` is always sent; a `Content-Type` among
    /// `headers` is ignored. Invalid header names or values are skipped.
    ///
    /// Returns `false` without side effects if a request is already
    /// outstanding.
    pub fn start_post<I, K, V>(&self, url: impl AsRef<str>, body: impl Into<Bytes>, headers: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.start(url.as_ref(), Some(body.into()), headers)
    }

    /// Cancel the active request, if any, and return to `None`.
    ///
    /// Emits [`aborted`](Self::aborted) only when a request was actually
    /// active. Safe to call in any state.
    pub fn abort(&self) {
        let _emitting = self.shared.emitting.lock();
        let mut notes = Notifications::default();
        {
            let mut inner = self.shared.inner.lock();
            if let Some(operation) = inner.active.take() {
                let cancelled = operation.cancel();
                tracing::debug!(target: "tether_net::controller", id = %operation.id(), cancelled, "request aborted");
                notes.aborted = true;
            }
            self.shared.transition(&mut inner, RequestState::None, &mut notes);
        }
        self.shared.deliver(notes);
    }

    /// Force the state back to `None`.
    ///
    /// An outstanding request is not cancelled: it is detached and keeps
    /// running at the transport, but its events are ignored from now on.
    pub fn reset_status(&self) {
        let _emitting = self.shared.emitting.lock();
        let mut notes = Notifications::default();
        {
            let mut inner = self.shared.inner.lock();
            if let Some(operation) = inner.active.as_ref() {
                tracing::debug!(target: "tether_net::controller", id = %operation.id(), "detaching request on reset");
            }
            self.shared.transition(&mut inner, RequestState::None, &mut notes);
        }
        self.shared.deliver(notes);
    }

    /// Signal emitted when the lifecycle state changes.
    pub fn state_changed(&self) -> &Signal<RequestState> {
        &self.shared.state_changed
    }

    /// Signal emitted when the busy flag flips.
    pub fn busy_changed(&self) -> &Signal<bool> {
        &self.shared.busy_changed
    }

    /// Signal emitted with the full body when a request completes.
    pub fn finished(&self) -> &Signal<Bytes> {
        &self.shared.finished
    }

    /// Signal emitted with a descriptive message when a request fails.
    pub fn error_occurred(&self) -> &Signal<String> {
        &self.shared.error_occurred
    }

    /// Signal emitted when an active request is aborted.
    pub fn aborted(&self) -> &Signal<()> {
        &self.shared.aborted
    }

    /// Signal emitted as response bytes arrive.
    pub fn download_progress(&self) -> &Signal<TransferProgress> {
        &self.shared.download_progress
    }

    fn start<I, K, V>(&self, url: &str, body: Option<Bytes>, headers: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let _emitting = self.shared.emitting.lock();

        // Leave a finished state first so observers see `None` while idle.
        let mut notes = Notifications::default();
        {
            let mut inner = self.shared.inner.lock();
            if self.shared.state.get().is_busy() {
                tracing::debug!(target: "tether_net::controller", url, "request rejected, controller busy");
                return false;
            }
            inner.buffer.clear();
            inner.status_code = None;
            inner.content_length = None;
            self.shared.transition(&mut inner, RequestState::None, &mut notes);
        }
        self.shared.deliver(notes);

        let mut notes = Notifications::default();
        {
            let mut inner = self.shared.inner.lock();
            // A slot may have started another request in the meantime.
            if self.shared.state.get().is_busy() {
                tracing::debug!(target: "tether_net::controller", url, "request rejected, controller busy");
                return false;
            }
            self.shared.transition(&mut inner, RequestState::Pending, &mut notes);

            let request = self.descriptor(url, headers);
            let method = if body.is_some() { "POST" } else { "GET" };
            let PendingOperation { handle, events } = match body {
                Some(body) => self.transport.post(request, body),
                None => self.transport.get(request),
            };
            let id = handle.id();
            tracing::debug!(target: "tether_net::controller", %id, method, url, "request started");
            inner.active = Some(handle);

            runtime::spawn(pump_events(Arc::downgrade(&self.shared), id, events));
        }
        self.shared.deliver(notes);
        true
    }

    fn descriptor<I, K, V>(&self, url: &str, headers: I) -> RequestDescriptor
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = RequestDescriptor::new(url).header(
            http::header::CONTENT_TYPE,
            self.config.content_type.clone(),
        );
        request.transfer_timeout = self.config.transfer_timeout;

        for (name, value) in headers {
            let (name, value) = (name.as_ref(), value.as_ref());
            let parsed = (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(value),
            );
            match parsed {
                (Ok(name), _) if name == http::header::CONTENT_TYPE => {
                    tracing::warn!(target: "tether_net::controller", "ignoring caller Content-Type, configured default applies");
                }
                (Ok(name), Ok(value)) => {
                    request.headers.append(name, value);
                }
                _ => {
                    tracing::warn!(target: "tether_net::controller", header = name, "skipping invalid header");
                }
            }
        }
        request
    }
}

impl Drop for RequestController {
    fn drop(&mut self) {
        if let Some(operation) = self.shared.inner.lock().active.take() {
            operation.cancel();
        }
    }
}

impl std::fmt::Debug for RequestController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestController")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}
