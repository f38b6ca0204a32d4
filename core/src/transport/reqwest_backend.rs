use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::trace;

use super::{ExchangeOutcome, Transport};
use crate::decode::BodyHandle;
use crate::http::{Headers, HttpMethod, WireRequest};

/// Future-based backend on top of `reqwest`.
///
/// The response body is left on the connection until it is decoded.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: Client,
}

impl Default for ReqwestBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ReqwestBackend {
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|_| Client::new());
        Self { client }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestBackend {
    async fn exchange(&self, request: WireRequest) -> ExchangeOutcome {
        let mut builder = self.client.request(method(request.method), request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return ExchangeOutcome::TransportFailure(err.to_string()),
        };

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        trace!(status, "reqwest exchange completed");

        let body = BodyHandle::streamed(async move { response.bytes().await.map_err(|e| e.to_string()) });
        ExchangeOutcome::completed(status, headers, body)
    }
}
