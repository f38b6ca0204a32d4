//! Asynchronous request dispatch for a remote posts collection.
//!
//! # Overview
//! `Dispatcher::dispatch` takes a `RequestSpec`, performs one HTTP exchange
//! through a pluggable transport backend, and settles once with either the
//! decoded JSON body or a `DispatchError`.
//!
//! # Design
//! - Two interchangeable backends sit behind the `Transport` trait:
//!   `reqwest` (future-based) and `ureq` (blocking, completion by callback,
//!   adapted by `CallbackAdapter`).
//! - Failures are two-tier: `Network` when no status arrived, `Application`
//!   when the status is outside `[200, 300)`. Error bodies are still decoded
//!   and attached as diagnostics.
//! - Response bodies are single-use `BodyHandle`s.
//! - Bodies are encoded as JSON or `multipart/form-data`, chosen by the
//!   caller; multipart can be derived from a `Form` of named controls.
//! - `PostsClient` is a thin typed layer for the posts collection.

pub mod classify;
pub mod client;
pub mod decode;
pub mod dispatcher;
pub mod encode;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use classify::{classify, Classification};
pub use client::PostsClient;
pub use decode::BodyHandle;
pub use dispatcher::{Dispatch, Dispatcher};
pub use encode::{encode, ContentKind, ControlValue, EncodedBody, Encoding, Form, FormControl, MultipartForm};
pub use error::{DecodeError, DispatchError, DispatchResult, EncodeError, FailureKind};
pub use http::{Headers, HttpMethod, RequestSpec, WireRequest};
pub use transport::{Backend, CallbackAdapter, CallbackTransport, ExchangeOutcome, ReqwestBackend, Transport, UreqBackend};
pub use types::{NewPost, Post};
