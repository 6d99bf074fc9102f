//! Error types for the networking module.

use std::fmt;

/// Network-specific errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// HTTP request failed.
    #[error("HTTP request error: {0}")]
    Request(String),
    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// Connection refused or failed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Host name resolution failed.
    #[error("Host not found: {0}")]
    HostNotFound(String),
    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// The response body could not be read to completion.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),
    /// HTTP error status (4xx or 5xx).
    #[error("HTTP {status}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
    },
    /// Redirect limit exceeded.
    #[error("Too many redirects")]
    TooManyRedirects,
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl NetworkError {
    /// Map this error onto the transport error taxonomy.
    pub fn code(&self) -> TransportErrorCode {
        match self {
            Self::Request(_) => TransportErrorCode::UnknownNetwork,
            Self::InvalidUrl(_) => TransportErrorCode::ProtocolUnknown,
            Self::Timeout => TransportErrorCode::Timeout,
            Self::Connection(_) => TransportErrorCode::ConnectionRefused,
            Self::HostNotFound(_) => TransportErrorCode::HostNotFound,
            Self::InvalidHeader(_) => TransportErrorCode::ProtocolInvalidOperation,
            Self::InvalidBody(_) => TransportErrorCode::RemoteHostClosed,
            Self::HttpStatus { status } => TransportErrorCode::from_http_status(*status)
                .unwrap_or(TransportErrorCode::ProtocolFailure),
            Self::TooManyRedirects => TransportErrorCode::ProtocolFailure,
            Self::ClientBuild(_) => TransportErrorCode::UnknownNetwork,
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            let chain = error_chain(&err);
            if chain.contains("dns error") {
                Self::HostNotFound(chain)
            } else {
                Self::Connection(chain)
            }
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else if err.is_body() || err.is_decode() {
            Self::InvalidBody(err.to_string())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Render an error together with its sources, outermost first.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl From<url::ParseError> for NetworkError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for NetworkError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for NetworkError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Classification of a failed transport operation.
///
/// Every variant carries a stable numeric [`code`](Self::code), grouped by
/// family: 1-99 network layer, 101-199 proxy, 201-299 content (HTTP 4xx),
/// 301-399 protocol, 401-499 server (HTTP 5xx).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportErrorCode {
    /// The remote server refused the connection.
    ConnectionRefused,
    /// The remote server closed the connection before the reply was complete.
    RemoteHostClosed,
    /// The remote host name was not found.
    HostNotFound,
    /// No progress was made within the transfer timeout.
    Timeout,
    /// The operation was cancelled before it finished.
    OperationCanceled,
    /// The TLS handshake failed.
    TlsHandshakeFailed,
    /// The connection was broken by a temporary network failure.
    TemporaryNetworkFailure,
    /// An unclassified network-layer error.
    UnknownNetwork,
    /// The proxy refused the connection.
    ProxyConnectionRefused,
    /// The server denied access to the resource (HTTP 403).
    ContentAccessDenied,
    /// The operation is not permitted on the resource (HTTP 405).
    ContentOperationNotPermitted,
    /// The resource was not found (HTTP 404).
    ContentNotFound,
    /// The server requires authentication (HTTP 401).
    AuthenticationRequired,
    /// The request conflicts with the resource state (HTTP 409).
    ContentConflict,
    /// The resource is no longer available (HTTP 410).
    ContentGone,
    /// Any other HTTP 4xx status.
    UnknownContent,
    /// The URL scheme or structure is not understood.
    ProtocolUnknown,
    /// The request could not be expressed in the protocol (e.g. invalid header).
    ProtocolInvalidOperation,
    /// A protocol violation, such as a redirect loop.
    ProtocolFailure,
    /// The server hit an internal error (HTTP 500).
    InternalServerError,
    /// The server does not implement the operation (HTTP 501).
    OperationNotImplemented,
    /// The server is unavailable (HTTP 503).
    ServiceUnavailable,
    /// Any other HTTP 5xx status.
    UnknownServer,
}

impl TransportErrorCode {
    const ALL: [Self; 23] = [
        Self::ConnectionRefused,
        Self::RemoteHostClosed,
        Self::HostNotFound,
        Self::Timeout,
        Self::OperationCanceled,
        Self::TlsHandshakeFailed,
        Self::TemporaryNetworkFailure,
        Self::UnknownNetwork,
        Self::ProxyConnectionRefused,
        Self::ContentAccessDenied,
        Self::ContentOperationNotPermitted,
        Self::ContentNotFound,
        Self::AuthenticationRequired,
        Self::ContentConflict,
        Self::ContentGone,
        Self::UnknownContent,
        Self::ProtocolUnknown,
        Self::ProtocolInvalidOperation,
        Self::ProtocolFailure,
        Self::InternalServerError,
        Self::OperationNotImplemented,
        Self::ServiceUnavailable,
        Self::UnknownServer,
    ];

    /// The stable numeric code.
    pub fn code(self) -> u16 {
        match self {
            Self::ConnectionRefused => 1,
            Self::RemoteHostClosed => 2,
            Self::HostNotFound => 3,
            Self::Timeout => 4,
            Self::OperationCanceled => 5,
            Self::TlsHandshakeFailed => 6,
            Self::TemporaryNetworkFailure => 7,
            Self::UnknownNetwork => 99,
            Self::ProxyConnectionRefused => 101,
            Self::ContentAccessDenied => 201,
            Self::ContentOperationNotPermitted => 202,
            Self::ContentNotFound => 203,
            Self::AuthenticationRequired => 204,
            Self::ContentConflict => 206,
            Self::ContentGone => 207,
            Self::UnknownContent => 299,
            Self::ProtocolUnknown => 301,
            Self::ProtocolInvalidOperation => 302,
            Self::ProtocolFailure => 399,
            Self::InternalServerError => 401,
            Self::OperationNotImplemented => 402,
            Self::ServiceUnavailable => 403,
            Self::UnknownServer => 499,
        }
    }

    /// Look up a variant by its numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|variant| variant.code() == code)
    }

    /// Classify an HTTP status. Returns `None` for non-error statuses.
    pub fn from_http_status(status: u16) -> Option<Self> {
        let code = match status {
            401 => Self::AuthenticationRequired,
            403 => Self::ContentAccessDenied,
            404 => Self::ContentNotFound,
            405 => Self::ContentOperationNotPermitted,
            409 => Self::ContentConflict,
            410 => Self::ContentGone,
            400..=499 => Self::UnknownContent,
            500 => Self::InternalServerError,
            501 => Self::OperationNotImplemented,
            503 => Self::ServiceUnavailable,
            500..=599 => Self::UnknownServer,
            _ => return None,
        };
        Some(code)
    }

    /// Short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::ConnectionRefused => "connection refused",
            Self::RemoteHostClosed => "remote host closed the connection",
            Self::HostNotFound => "host not found",
            Self::Timeout => "operation timed out",
            Self::OperationCanceled => "operation canceled",
            Self::TlsHandshakeFailed => "TLS handshake failed",
            Self::TemporaryNetworkFailure => "temporary network failure",
            Self::UnknownNetwork => "unknown network error",
            Self::ProxyConnectionRefused => "proxy connection refused",
            Self::ContentAccessDenied => "access denied",
            Self::ContentOperationNotPermitted => "operation not permitted",
            Self::ContentNotFound => "content not found",
            Self::AuthenticationRequired => "authentication required",
            Self::ContentConflict => "content conflict",
            Self::ContentGone => "content gone",
            Self::UnknownContent => "unknown content error",
            Self::ProtocolUnknown => "unknown protocol",
            Self::ProtocolInvalidOperation => "invalid protocol operation",
            Self::ProtocolFailure => "protocol failure",
            Self::InternalServerError => "internal server error",
            Self::OperationNotImplemented => "operation not implemented",
            Self::ServiceUnavailable => "service unavailable",
            Self::UnknownServer => "unknown server error",
        }
    }
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

/// A failure reported by a transport for one operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    /// The error classification.
    pub code: TransportErrorCode,
    /// Free-form detail from the underlying client.
    pub detail: String,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(code: TransportErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "Network error {}", self.code)
        } else {
            write!(f, "Network error {}: {}", self.code, self.detail)
        }
    }
}

impl std::error::Error for TransportError {}

impl From<NetworkError> for TransportError {
    fn from(err: NetworkError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
