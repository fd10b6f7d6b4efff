//! Error types for WebProxy client operations

use thiserror::Error;

use crate::message;

/// Result type alias for WebProxy client operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Failure category of a [`ProxyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Payload was not JSON or did not have the expected shape
    InvalidFormat,
    /// HTTP 401
    Unauthorized,
    /// HTTP 403
    Forbidden,
    /// HTTP 422
    Unprocessable,
    /// Any other non-2xx status
    OperationFailed,
    /// Connection-level failure reported by the HTTP transport
    TransportFailure,
    /// The call was rejected locally before any request was sent
    InvalidArgument,
}

/// Errors that can occur during WebProxy client operations
///
/// The classified variants carry the complete, human-readable message built
/// by [`crate::message`], so `to_string()` is suitable for end users.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Response body did not parse as JSON or did not match the expected shape
    #[error("{0}")]
    InvalidFormat(String),

    /// Missing or invalid access token
    #[error("{0}")]
    Unauthorized(String),

    /// Token lacks permissions or target is not reconfigurable
    #[error("{0}")]
    Forbidden(String),

    /// Target device or property is not reconfigurable
    #[error("{0}")]
    Unprocessable(String),

    /// Server answered with any other error status
    #[error("{message}")]
    OperationFailed { status: u16, message: String },

    /// HTTP request failed below the HTTP layer
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Access token cannot be carried in an HTTP header
    #[error("Invalid access token: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Request body could not be encoded as JSON
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// Injected property names are flat; the WebProxy rejects paths
    #[error("Invalid injected property name '{0}': names must not contain '.'")]
    InvalidPropertyName(String),
}

impl ProxyError {
    /// Create an invalid-format error from the underlying decode failure
    pub fn invalid_format(reason: impl std::fmt::Display) -> Self {
        Self::InvalidFormat(message::invalid_response_format(reason))
    }

    /// The failure category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Unprocessable(_) => ErrorKind::Unprocessable,
            Self::OperationFailed { .. } => ErrorKind::OperationFailed,
            Self::Transport(_) | Self::Io(_) => ErrorKind::TransportFailure,
            Self::InvalidUrl(_)
            | Self::InvalidHeader(_)
            | Self::Encode(_)
            | Self::InvalidPropertyName(_) => ErrorKind::InvalidArgument,
        }
    }

    /// HTTP status that caused this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::Unprocessable(_) => Some(422),
            Self::OperationFailed { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
