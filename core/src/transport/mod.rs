//! Transport backends.
//!
//! # Design
//! The dispatcher only knows `Transport`: send a `WireRequest`, get back one
//! `ExchangeOutcome`. Backends that report completion through a callback
//! implement `CallbackTransport` instead and are turned into a `Transport` by
//! `CallbackAdapter`, which is the only place callbacks meet futures.
//!
//! Two backends ship with the crate:
//! - `ReqwestBackend`, future-based, body streamed on first decode.
//! - `UreqBackend`, blocking I/O on a worker thread, completion by callback.

mod reqwest_backend;
mod ureq_backend;

use std::time::Duration;

use async_trait::async_trait;
use futures::channel::oneshot;

use crate::decode::BodyHandle;
use crate::http::{Headers, WireRequest};

pub use reqwest_backend::ReqwestBackend;
pub use ureq_backend::UreqBackend;

/// A response that arrived with a status.
#[derive(Debug)]
pub struct CompletedExchange {
    pub status: u16,
    pub headers: Headers,
    pub body: BodyHandle,
}

/// What a backend reports for one exchange.
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// No status was produced. The string describes the failure.
    TransportFailure(String),
    Completed(CompletedExchange),
}

impl ExchangeOutcome {
    pub fn completed(status: u16, headers: Headers, body: BodyHandle) -> Self {
        ExchangeOutcome::Completed(CompletedExchange {
            status,
            headers,
            body,
        })
    }
}

/// Future-based backend contract.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, request: WireRequest) -> ExchangeOutcome;
}

/// Called exactly once with the outcome of an exchange.
pub type Completion = Box<dyn FnOnce(ExchangeOutcome) + Send + 'static>;

/// Callback-based backend contract. `issue` must return without blocking
/// and arrange for `on_complete` to run once the exchange finishes.
pub trait CallbackTransport: Send + Sync {
    fn issue(&self, request: WireRequest, on_complete: Completion);
}

/// Adapts a `CallbackTransport` to `Transport`.
#[derive(Debug, Clone)]
pub struct CallbackAdapter<B> {
    backend: B,
}

impl<B: CallbackTransport> CallbackAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: CallbackTransport> Transport for CallbackAdapter<B> {
    async fn exchange(&self, request: WireRequest) -> ExchangeOutcome {
        let (tx, rx) = oneshot::channel();
        self.backend.issue(
            request,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );
        rx.await.unwrap_or_else(|_| {
            ExchangeOutcome::TransportFailure("backend dropped the exchange without completing it".to_string())
        })
    }
}

/// Which built-in backend a dispatcher uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// `reqwest`, future-based.
    #[default]
    Future,
    /// `ureq` on a worker thread, callback-based.
    Callback,
}

/// Build the transport for `backend`. `timeout` is enforced by the backend
/// itself; `None` leaves the backend's own default in place.
pub fn transport_for(backend: Backend, timeout: Option<Duration>) -> Box<dyn Transport> {
    match backend {
        Backend::Future => Box::new(ReqwestBackend::new(timeout)),
        Backend::Callback => Box::new(CallbackAdapter::new(UreqBackend::new(timeout))),
    }
}
