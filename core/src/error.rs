//! Error types for request dispatch.
//!
//! # Design
//! Failures are split by where they happened. `Network` means no status ever
//! arrived. `Application` means the server answered outside the 2xx range; the
//! diagnostic body it sent is decoded on a best-effort basis and attached.
//! Encoding and decoding failures get their own variants so a caller can tell
//! "could not reach the server" from "server rejected the request" from
//! "server's payload could not be understood."
//!
//! Every error is `Clone` because a settled dispatch hands the same result to
//! every observer.

use serde_json::Value;
use thiserror::Error;

/// Failure of the response decode step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The body bytes were present but could not be parsed, or could not be
    /// read after the status arrived.
    #[error("response body could not be parsed: {0}")]
    Parse(String),

    /// The body handle was already decoded once.
    #[error("response body was already consumed")]
    AlreadyConsumed,
}

/// Failure of the request body encoding step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request body could not be encoded: {0}")]
pub struct EncodeError(pub String);

/// Coarse classification of a `DispatchError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Application,
    Encoding,
    Parse,
    AlreadyConsumed,
    InvalidRequest,
}

/// Settled failure of a dispatch.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The exchange never produced a status: connection refused, DNS
    /// failure, transport-level timeout.
    #[error("request could not be sent: {0}")]
    Network(String),

    /// The server answered with a status outside `[200, 300)`.
    ///
    /// `diagnostic` holds the decoded body unless decoding failed, in which
    /// case `decode_error` says why.
    #[error("server responded with status {status}")]
    Application {
        status: u16,
        diagnostic: Option<Value>,
        decode_error: Option<DecodeError>,
    },

    #[error(transparent)]
    Encoding(#[from] EncodeError),

    /// A 2xx body could not be parsed, or did not have the expected shape.
    #[error("response body could not be parsed: {0}")]
    Parse(String),

    #[error("response body was already consumed")]
    AlreadyConsumed,

    /// The request violated an input constraint and was never sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DispatchError::Network(_) => FailureKind::Network,
            DispatchError::Application { .. } => FailureKind::Application,
            DispatchError::Encoding(_) => FailureKind::Encoding,
            DispatchError::Parse(_) => FailureKind::Parse,
            DispatchError::AlreadyConsumed => FailureKind::AlreadyConsumed,
            DispatchError::InvalidRequest(_) => FailureKind::InvalidRequest,
        }
    }

    /// Status code of an application error; `None` for every other kind.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<DecodeError> for DispatchError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Parse(msg) => DispatchError::Parse(msg),
            DecodeError::AlreadyConsumed => DispatchError::AlreadyConsumed,
        }
    }
}

/// Result of a settled dispatch.
pub type DispatchResult<T> = Result<T, DispatchError>;
