//! Blocking `ureq` client run on tokio's blocking pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use ureq::{Agent, RequestBuilder};

use super::{RawResponse, Transport, TransportCallback};
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, ResponseMetadata};
use crate::token::Cancellable;

/// A `Transport` backed by `ureq`.
///
/// Status codes are never turned into errors, so 4xx/5xx responses come back
/// as data for the classifier. Each request gets an agent configured with the
/// request's own timeout. A built body is always sent, GET and DELETE
/// included. Response bodies are read without a size cap; an empty body is
/// reported as absent, and a body that fails to read is reported as a
/// transport failure without metadata.
///
/// `ureq` cannot abort a call that is already on the wire. Cancelling marks
/// the operation, and whatever the call returns afterwards is reported as
/// `TransportError::Cancelled` without response metadata.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    runtime: Handle,
}

impl UreqTransport {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

#[derive(Debug, Default)]
struct Operation {
    cancelled: AtomicBool,
}

impl Operation {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Cancellable for Operation {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest, callback: TransportCallback) -> Arc<dyn Cancellable> {
        let operation = Arc::new(Operation::default());
        let in_flight = Arc::clone(&operation);

        self.runtime.spawn_blocking(move || {
            let raw = if in_flight.is_cancelled() {
                RawResponse::failed(TransportError::Cancelled)
            } else {
                let raw = execute(request);
                if in_flight.is_cancelled() {
                    RawResponse::failed(TransportError::Cancelled)
                } else {
                    raw
                }
            };
            callback(raw);
            drop(in_flight);
        });

        operation
    }
}

/// Execute an `HttpRequest` and collect everything ureq reports.
fn execute(request: HttpRequest) -> RawResponse {
    let agent: Agent = Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(request.timeout))
        .build()
        .new_agent();

    let url = request.url.as_str();
    let headers = &request.headers;
    tracing::debug!(method = %request.method, %url, "sending request");

    let result = match (request.method, request.body.as_deref()) {
        (HttpMethod::Get, Some(body)) => with_headers(agent.get(url), headers)
            .force_send_body()
            .send(body),
        (HttpMethod::Get, None) => with_headers(agent.get(url), headers).call(),
        (HttpMethod::Delete, Some(body)) => with_headers(agent.delete(url), headers)
            .force_send_body()
            .send(body),
        (HttpMethod::Delete, None) => with_headers(agent.delete(url), headers).call(),
        (HttpMethod::Post, Some(body)) => with_headers(agent.post(url), headers).send(body),
        (HttpMethod::Post, None) => with_headers(agent.post(url), headers).send_empty(),
        (HttpMethod::Put, Some(body)) => with_headers(agent.put(url), headers).send(body),
        (HttpMethod::Put, None) => with_headers(agent.put(url), headers).send_empty(),
        (HttpMethod::Patch, Some(body)) => with_headers(agent.patch(url), headers).send(body),
        (HttpMethod::Patch, None) => with_headers(agent.patch(url), headers).send_empty(),
    };

    let mut response = match result {
        Ok(response) => response,
        Err(err) => return RawResponse::failed(transport_error(err)),
    };

    let metadata = ResponseMetadata {
        status: response.status().as_u16(),
        headers: response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_owned(), value.to_owned()))
            })
            .collect(),
    };

    // A reply whose body cannot be read in full is not a response.
    match response.body_mut().with_config().limit(u64::MAX).read_to_vec() {
        Ok(body) => RawResponse {
            body: (!body.is_empty()).then_some(body),
            error: None,
            metadata: Some(metadata),
        },
        Err(err) => {
            tracing::debug!(status = metadata.status, error = %err, "failed to read response body");
            RawResponse::failed(transport_error(err))
        }
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn transport_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Connection(other.to_string()),
    }
}
