//! Error types for the topic annotator.
//!
//! Library crates use [`TopicAnnotatorError`] via `thiserror`.
//! The service binary wraps this with `color-eyre` for rich diagnostics.

use std::fmt;
use std::path::PathBuf;

/// Outcome reported by a remote system when a call did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    /// The remote answered with an HTTP status outside the accepted range.
    Http(u16),
    /// The request never produced a response (DNS, refused, timeout...).
    Transport(String),
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(code) => write!(f, "{code}"),
            Self::Transport(reason) => write!(f, "transport error ({reason})"),
        }
    }
}

/// Top-level error type for all topic annotator operations.
#[derive(Debug, thiserror::Error)]
pub enum TopicAnnotatorError {
    /// A call to Smartlogic or PAC failed at the transport level or returned
    /// a status above 202.
    #[error("request to {url} returned status: {status}; UUID: {subject} response body: {body}")]
    RemoteWriteFailed {
        url: String,
        status: RemoteStatus,
        subject: String,
        body: String,
    },

    /// Missing or malformed inbound request parameters.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A remote payload could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// An outbound payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TopicAnnotatorError>;

impl TopicAnnotatorError {
    /// Create a remote failure for `url` concerning `subject` (a concept or content UUID).
    pub fn remote(
        url: impl Into<String>,
        status: RemoteStatus,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::RemoteWriteFailed {
            url: url.into(),
            status,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Create a bad request error from any displayable message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was caused by the caller rather than a remote system.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::BadRequest { .. })
    }
}
