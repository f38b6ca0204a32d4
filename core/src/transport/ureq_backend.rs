use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tracing::trace;
use ureq::http::Response;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, Body, RequestBuilder};

use super::{CallbackTransport, Completion, ExchangeOutcome};
use crate::decode::BodyHandle;
use crate::http::{Headers, HttpMethod, WireRequest};

/// Callback-based backend on top of blocking `ureq`.
///
/// Each exchange runs on its own thread, reads the whole body there, and
/// reports through the completion callback.
#[derive(Clone)]
pub struct UreqBackend {
    agent: Agent,
}

impl Default for UreqBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UreqBackend {
    pub fn new(timeout: Option<Duration>) -> Self {
        // Non-2xx statuses must come back as data, not as `Err`.
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl CallbackTransport for UreqBackend {
    fn issue(&self, request: WireRequest, on_complete: Completion) {
        let agent = self.agent.clone();
        thread::spawn(move || on_complete(perform(&agent, request)));
    }
}

fn perform(agent: &Agent, request: WireRequest) -> ExchangeOutcome {
    let url = request.url.as_str();
    let headers = &request.headers;
    let body = request.body;

    let sent = match request.method {
        HttpMethod::Get => without_body(with_headers(agent.get(url), headers), body),
        HttpMethod::Delete => without_body(with_headers(agent.delete(url), headers), body),
        HttpMethod::Post => with_body(with_headers(agent.post(url), headers), body),
        HttpMethod::Put => with_body(with_headers(agent.put(url), headers), body),
        HttpMethod::Patch => with_body(with_headers(agent.patch(url), headers), body),
    };

    let mut response = match sent {
        Ok(response) => response,
        Err(err) => return ExchangeOutcome::TransportFailure(err.to_string()),
    };

    let status = response.status().as_u16();
    let response_headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    trace!(status, "ureq exchange completed");

    // ureq caps reads at 10 MiB by default; reqwest has no cap.
    let body = match response.body_mut().with_config().limit(u64::MAX).read_to_vec() {
        Ok(bytes) => BodyHandle::buffered(bytes),
        Err(err) => BodyHandle::failed(err.to_string()),
    };
    ExchangeOutcome::completed(status, response_headers, body)
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &Headers) -> RequestBuilder<B> {
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder
}

fn without_body(builder: RequestBuilder<WithoutBody>, body: Option<Bytes>) -> Result<Response<Body>, ureq::Error> {
    match body {
        Some(body) => builder.force_send_body().send(&body[..]),
        None => builder.call(),
    }
}

fn with_body(builder: RequestBuilder<WithBody>, body: Option<Bytes>) -> Result<Response<Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(&body[..]),
        None => builder.send_empty(),
    }
}
