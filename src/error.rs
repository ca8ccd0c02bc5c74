//! Error types for ARI bus operations

use thiserror::Error;

/// Result alias used throughout the crate.
pub type AriResult<T> = Result<T, AriError>;

/// Errors surfaced by the connection, the dispatcher and the resource clients.
///
/// Three classes matter to callers:
/// - transport failures ([`Transport`](Self::Transport), [`ConnectionClosed`](Self::ConnectionClosed)),
/// - [`Timeout`](Self::Timeout), when no reply arrived within the per-attempt bound,
/// - [`Application`](Self::Application), a well-formed reply carrying a domain failure.
///
/// Only `Transport` and `Timeout` are retried for read operations; see
/// [`is_retry_eligible`](Self::is_retry_eligible).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AriError {
    /// The bus rejected or failed to carry the message (not connected, no responders, I/O).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The client was cleaned up; the bus handle is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// No reply arrived before the request timeout elapsed.
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The gateway replied with an error (e.g. resource not found).
    #[error("application error: {message}")]
    Application { message: String },

    /// Request encoding or reply decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A subject or subject pattern was empty or malformed.
    #[error("invalid subject: {0}")]
    InvalidSubject(String),
}

impl AriError {
    /// Create a transport error from anything printable.
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// Create an application error.
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    /// `true` for bus-level failures, including use after cleanup.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ConnectionClosed)
    }

    /// `true` if the request timed out waiting for a reply.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// `true` if the gateway answered with a domain-level error.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// Whether a read operation may be re-issued after this failure.
    ///
    /// Only exchanges that produced no reply body qualify. `ConnectionClosed` is
    /// excluded: the handle will not come back.
    pub fn is_retry_eligible(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}
