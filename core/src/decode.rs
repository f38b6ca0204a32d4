//! Single-use response body handle.
//!
//! # Design
//! A response body is a stream that can be read once. `BodyHandle` makes
//! that explicit: it starts `Unconsumed`, holding a future that yields the
//! body bytes, and the first `decode` call takes that future out. Any later
//! call finds nothing to take and fails with `AlreadyConsumed`.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Value};

use crate::error::DecodeError;

type BodySource = BoxFuture<'static, Result<Bytes, String>>;

/// Response body that may be decoded at most once.
pub struct BodyHandle {
    source: Mutex<Option<BodySource>>,
}

impl BodyHandle {
    /// A body whose bytes are already in memory.
    pub fn buffered(bytes: impl Into<Bytes>) -> Self {
        Self::streamed(future::ready(Ok(bytes.into())))
    }

    /// A body that could not be read after the status arrived.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::streamed(future::ready(Err(reason.into())))
    }

    /// A body produced lazily by `source`. The future is not polled until
    /// the first `decode`.
    pub fn streamed<F>(source: F) -> Self
    where
        F: Future<Output = Result<Bytes, String>> + Send + 'static,
    {
        Self {
            source: Mutex::new(Some(source.boxed())),
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Read the body and parse it as JSON.
    ///
    /// A body with no usable bytes decodes to an empty object. Bytes that
    /// are present but malformed fail with `DecodeError::Parse`.
    pub async fn decode(&self) -> Result<Value, DecodeError> {
        let source = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(DecodeError::AlreadyConsumed)?;
        let bytes = source
            .await
            .map_err(|e| DecodeError::Parse(format!("body could not be read: {e}")))?;
        parse(&bytes)
    }
}

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyHandle")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

fn parse(bytes: &[u8]) -> Result<Value, DecodeError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| DecodeError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn decodes_json_once() {
        let body = BodyHandle::buffered(r#"{"error":"not found"}"#);
        assert!(!body.is_consumed());
        assert_eq!(body.decode().await.unwrap(), json!({"error": "not found"}));
        assert!(body.is_consumed());
    }

    #[tokio::test]
    async fn second_decode_is_rejected() {
        let body = BodyHandle::buffered("[1,2]");
        body.decode().await.unwrap();
        assert_eq!(body.decode().await.unwrap_err(), DecodeError::AlreadyConsumed);
    }

    #[tokio::test]
    async fn failed_decode_still_consumes() {
        let body = BodyHandle::buffered("not json");
        assert!(matches!(body.decode().await, Err(DecodeError::Parse(_))));
        assert_eq!(body.decode().await.unwrap_err(), DecodeError::AlreadyConsumed);
    }

    #[tokio::test]
    async fn empty_body_decodes_to_empty_object() {
        assert_eq!(BodyHandle::buffered("").decode().await.unwrap(), json!({}));
        assert_eq!(BodyHandle::buffered(" \r\n").decode().await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn unreadable_body_is_a_parse_error() {
        let err = BodyHandle::failed("connection reset").decode().await.unwrap_err();
        assert_eq!(
            err,
            DecodeError::Parse("body could not be read: connection reset".to_string())
        );
    }

    #[tokio::test]
    async fn source_is_read_only_on_first_decode() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let body = BodyHandle::streamed(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"{}"))
        });
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        body.decode().await.unwrap();
        let _ = body.decode().await;
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }
}
