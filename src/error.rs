/// Error type returned by this crate.
///
/// Only request construction defects and explicit result conversions
/// surface as `ApiError`; failed attempts are reported through
/// [`ClientResult`](crate::ClientResult).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Header name or value rejected while building a request.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    /// Request could not be built from the supplied parts.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Request payload could not be serialized to JSON.
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Response payload did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// Terminal failure converted from a [`ClientResult`](crate::ClientResult).
    #[error("request failed with status {status}: {message}")]
    Request { status: u16, message: String },
}

/// Failure reported by a [`Transport`](crate::Transport) implementation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

/// Coarse cause of a transport failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The attempt exceeded its timeout.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// Any other failure while sending or reading the response.
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Other => "transport",
        };
        f.write_str(label)
    }
}

impl TransportError {
    pub fn timeout() -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: "Request timeout".to_owned(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Connect,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}
