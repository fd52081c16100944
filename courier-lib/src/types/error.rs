use std::time::Duration;

use thiserror::Error;

/// Boxed error used where the underlying cause comes from different layers
/// (socket, TLS or the HTTP connection itself).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Possible errors when issuing requests with `courier_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The caller supplied a request that cannot be built.
    /// Raised before any network I/O takes place.
    #[error("Invalid request configuration: {0}")]
    InvalidConfig(String),

    /// DNS resolution, TCP connect or the TLS handshake failed, or the peer
    /// closed the connection before a complete response was received.
    #[error("Cannot connect to {origin}: {source}")]
    Connection {
        /// The origin the client tried to talk to
        origin: String,
        /// The underlying cause
        #[source]
        source: BoxError,
    },

    /// The request deadline was exceeded.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The peer sent malformed HTTP framing.
    #[error("Malformed HTTP message from {origin}: {source}")]
    Protocol {
        /// The origin that sent the malformed message
        origin: String,
        /// The parse error reported by the HTTP implementation
        #[source]
        source: hyper::Error,
    },

    /// The response body could not be parsed in the requested format.
    #[error("Cannot parse response body: {0}")]
    Parse(String),

    /// A single-pass body was accessed more than once.
    #[error("Body has already been consumed")]
    BodyConsumed,

    /// Local I/O failed while streaming a body from or to the caller.
    #[error("I/O error while streaming body: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorKind {
    /// Classify an error reported by the HTTP connection of `origin`.
    ///
    /// Parse failures are protocol errors, everything else means the
    /// connection is unusable.
    pub(crate) fn from_hyper(origin: impl ToString, err: hyper::Error) -> Self {
        if err.is_parse() || err.is_parse_status() || err.is_parse_too_large() {
            Self::Protocol {
                origin: origin.to_string(),
                source: err,
            }
        } else {
            Self::Connection {
                origin: origin.to_string(),
                source: Box::new(err),
            }
        }
    }

    /// Returns `true` if this error was caused by an exceeded deadline.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns `true` if this error happened while connecting or talking to
    /// the peer.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns `true` if the request was rejected before any I/O.
    #[must_use]
    pub const fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}

impl From<url::ParseError> for ErrorKind {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidConfig(format!("Cannot parse URL: {e}"))
    }
}

impl From<http::header::InvalidHeaderName> for ErrorKind {
    fn from(e: http::header::InvalidHeaderName) -> Self {
        Self::InvalidConfig(format!("Invalid header name: {e}"))
    }
}

impl From<http::header::InvalidHeaderValue> for ErrorKind {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidConfig(format!("Invalid header value: {e}"))
    }
}

impl From<http::method::InvalidMethod> for ErrorKind {
    fn from(e: http::method::InvalidMethod) -> Self {
        Self::InvalidConfig(format!("Invalid method: {e}"))
    }
}

impl From<serde_json::Error> for ErrorKind {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
