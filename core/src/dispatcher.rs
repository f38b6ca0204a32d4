//! The dispatch entry point.
//!
//! # Design
//! `Dispatcher` holds nothing but a shared transport, so every `dispatch`
//! call is independent. A call validates the `RequestSpec`, performs one
//! exchange, classifies the status and decodes the body exactly once, for
//! error statuses too. The returned `Dispatch` is a shared future: clones
//! resolve to the same settled result and never repeat the exchange.
//!
//! Nothing is sent until the `Dispatch` is first polled.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::classify::{classify, Classification};
use crate::encode::{ContentKind, APPLICATION_JSON, CONTENT_TYPE};
use crate::error::{DispatchError, DispatchResult};
use crate::http::{RequestSpec, WireRequest};
use crate::transport::{transport_for, Backend, CompletedExchange, ExchangeOutcome, Transport};

/// Entry point for sending requests through a transport backend.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Dispatcher over one of the built-in backends.
    pub fn with_backend(backend: Backend, timeout: Option<Duration>) -> Self {
        Self {
            transport: Arc::from(transport_for(backend, timeout)),
        }
    }

    /// Validate `spec` and send it as one exchange.
    ///
    /// The returned `Dispatch` is lazy: nothing is validated or sent until it
    /// is first polled, and a `Dispatch` dropped before that sends nothing.
    /// Once polled, it must be driven to completion for the exchange to
    /// settle. Dropping every clone mid-flight abandons the exchange, and a
    /// future-based backend closes the connection. Clones share the one
    /// exchange and its settled result.
    pub fn dispatch(&self, spec: RequestSpec) -> Dispatch {
        let transport = Arc::clone(&self.transport);
        Dispatch {
            inner: run(transport, spec).boxed().shared(),
        }
    }
}

/// A dispatch in flight or settled.
#[derive(Clone)]
pub struct Dispatch {
    inner: Shared<BoxFuture<'static, DispatchResult<Value>>>,
}

impl Dispatch {
    /// The settled result, if the dispatch has completed.
    pub fn peek(&self) -> Option<&DispatchResult<Value>> {
        self.inner.peek()
    }
}

impl Future for Dispatch {
    type Output = DispatchResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

async fn run(transport: Arc<dyn Transport>, spec: RequestSpec) -> DispatchResult<Value> {
    let request = prepare(spec)?;
    let method = request.method;
    let url = request.url.clone();
    debug!(%method, %url, "dispatching request");

    let result = match transport.exchange(request).await {
        ExchangeOutcome::TransportFailure(reason) => {
            warn!(%method, %url, %reason, "transport failure");
            Err(DispatchError::Network(reason))
        }
        ExchangeOutcome::Completed(exchange) => settle(exchange).await,
    };

    match &result {
        Ok(_) => debug!(%method, %url, "dispatch succeeded"),
        Err(err) => debug!(%method, %url, kind = ?err.kind(), "dispatch failed"),
    }
    result
}

async fn settle(exchange: CompletedExchange) -> DispatchResult<Value> {
    let status = exchange.status;
    match classify(status) {
        Classification::Success => Ok(exchange.body.decode().await?),
        Classification::ApplicationError => {
            let decoded = exchange.body.decode().await;
            let (diagnostic, decode_error) = match decoded {
                Ok(value) => (Some(value), None),
                Err(err) => (None, Some(err)),
            };
            Err(DispatchError::Application {
                status,
                diagnostic,
                decode_error,
            })
        }
    }
}

/// Check input constraints and merge the body's headers into the request.
fn prepare(spec: RequestSpec) -> DispatchResult<WireRequest> {
    let url = Url::parse(&spec.url)
        .map_err(|e| DispatchError::InvalidRequest(format!("`{}` is not an absolute URL: {e}", spec.url)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DispatchError::InvalidRequest(format!(
            "unsupported URL scheme `{}`",
            url.scheme()
        )));
    }

    let mut headers = spec.headers;
    let body = match spec.body {
        None => None,
        Some(encoded) => {
            if let Some(declared) = headers.get(CONTENT_TYPE) {
                match encoded.kind {
                    ContentKind::Multipart => {
                        return Err(DispatchError::InvalidRequest(
                            "multipart bodies set their own content-type".to_string(),
                        ))
                    }
                    ContentKind::Json if !is_json(declared) => {
                        return Err(DispatchError::InvalidRequest(format!(
                            "content-type `{declared}` contradicts a JSON body"
                        )))
                    }
                    ContentKind::Json => {}
                }
            }
            for (name, value) in encoded.headers.iter() {
                if !headers.contains(name) {
                    headers.set(name, value);
                }
            }
            Some(encoded.payload)
        }
    };

    for (name, value) in headers.iter() {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(DispatchError::InvalidRequest(format!("`{name}` is not a valid header name")));
        }
        if HeaderValue::from_str(value).is_err() {
            return Err(DispatchError::InvalidRequest(format!("header `{name}` has an invalid value")));
        }
    }

    Ok(WireRequest {
        method: spec.method,
        url,
        headers,
        body,
    })
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(APPLICATION_JSON))
}
