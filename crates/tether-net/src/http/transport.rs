//! `reqwest`-backed [`Transport`] implementation.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;

use super::client::HttpClient;
use crate::error::{NetworkError, Result};
use crate::runtime;
use crate::transport::{
    OperationSink, PendingOperation, RequestDescriptor, Transport, operation_channel,
};

/// Runs controller operations over a shared [`HttpClient`].
///
/// Each operation is driven by its own task on the tokio runtime (see
/// [`crate::runtime`]). The response body is streamed chunk by chunk into the
/// operation's sink. The descriptor's transfer timeout bounds every wait:
/// connecting plus receiving the response head, and each gap between body
/// chunks. A 4xx or 5xx status is reported as a failure after the body has
/// been delivered, so error pages stay inspectable.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    /// Create a transport with a default-configured client.
    pub fn new() -> Result<Self> {
        Ok(Self::from_client(HttpClient::new()?))
    }

    /// Create a transport over an existing client.
    pub fn from_client(client: HttpClient) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying HTTP client.
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    fn start(
        &self,
        method: http::Method,
        request: RequestDescriptor,
        body: Option<Bytes>,
    ) -> PendingOperation {
        let (handle, sink, events) = operation_channel();
        let client = self.client.clone();

        tracing::debug!(
            target: "tether_net::transport",
            id = %sink.id(),
            %method,
            url = %request.url,
            "starting operation"
        );

        runtime::spawn(async move {
            tokio::select! {
                _ = sink.cancelled() => {
                    tracing::debug!(target: "tether_net::transport", id = %sink.id(), "operation cancelled");
                }
                result = execute(&client, method, request, body, &sink) => {
                    match result {
                        Ok(()) => {
                            tracing::debug!(target: "tether_net::transport", id = %sink.id(), "operation finished");
                            sink.finish();
                        }
                        Err(err) => {
                            tracing::warn!(target: "tether_net::transport", id = %sink.id(), error = %err, "operation failed");
                            sink.fail(err);
                        }
                    }
                }
            }
        });

        PendingOperation::new(handle, events)
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: RequestDescriptor) -> PendingOperation {
        self.start(http::Method::GET, request, None)
    }

    fn post(&self, request: RequestDescriptor, body: Bytes) -> PendingOperation {
        self.start(http::Method::POST, request, Some(body))
    }
}

async fn execute(
    client: &HttpClient,
    method: http::Method,
    request: RequestDescriptor,
    body: Option<Bytes>,
    sink: &OperationSink,
) -> Result<()> {
    let url = url::Url::parse(&request.url)?;
    let timeout = request.transfer_timeout;

    let mut builder = client
        .reqwest_client()
        .request(method, url)
        .headers(request.headers);
    if let Some(body) = body {
        builder = builder.body(body);
    }

    let response = within(timeout, builder.send()).await??;
    let status = response.status();
    sink.set_metadata(status.as_u16(), response.content_length());

    let mut stream = response.bytes_stream();
    while let Some(chunk) = within(timeout, stream.next()).await? {
        sink.write(chunk?);
    }

    if status.is_client_error() || status.is_server_error() {
        return Err(NetworkError::HttpStatus {
            status: status.as_u16(),
        });
    }
    Ok(())
}

/// Await `future`, failing with [`NetworkError::Timeout`] after `limit`.
async fn within<F: Future>(limit: Option<Duration>, future: F) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| NetworkError::Timeout),
        None => Ok(future.await),
    }
}
