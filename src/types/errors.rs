//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. The
//! variants mirror the caller-visible failure taxonomy: a caller must be
//! able to branch on "not found" vs "transport" vs "tool refused" vs
//! "invalid argument" rather than receiving one generic error.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the orchestrator.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad caller input, e.g. an empty task id (wire code INVALID_ARGUMENT).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown or unhealthy tool, unknown method (wire code NOT_FOUND).
    #[error("not found: {0}")]
    NotFound(String),

    /// The tool was reachable but reported an application-level error
    /// string (wire code ABORTED). Distinct from transport failure.
    #[error("aborted: {0}")]
    Aborted(String),

    /// Transport or infrastructure failure (wire code INTERNAL).
    #[error("internal error: {0}")]
    Internal(String),

    /// A bounded call exceeded its deadline (wire code DEADLINE_EXCEEDED).
    #[error("timeout: {0}")]
    Timeout(String),

    /// An error frame decoded from a remote peer, code preserved verbatim.
    #[error("remote error [{code}]: {message}")]
    Remote { code: String, message: String },

    /// JSON serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Msgpack encoding errors.
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Msgpack decoding errors.
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wire error code written into error frames and mirrored onto HTTP
    /// status codes by the gateway.
    pub fn wire_code(&self) -> &str {
        match self {
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Aborted(_) => "ABORTED",
            Error::Timeout(_) => "DEADLINE_EXCEEDED",
            Error::Remote { code, .. } => code,
            Error::Internal(_)
            | Error::Serialization(_)
            | Error::Encode(_)
            | Error::Decode(_)
            | Error::Io(_) => "INTERNAL",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}
