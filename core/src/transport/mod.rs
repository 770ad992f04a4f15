//! The transport boundary.
//!
//! # Design
//! A `Transport` puts an `HttpRequest` on the wire and reports back exactly
//! once through its callback with whatever it got: payload bytes, a transport
//! error, response metadata, or any combination of them. It does not
//! interpret status codes; that is the classifier's job.
//!
//! `send` returns the in-flight operation as an `Arc`. The transport keeps its
//! own strong reference while the exchange runs and drops it after invoking
//! the callback, so tokens (which only hold a `Weak`) stop reaching it once
//! the request is finished.

mod ureq_transport;

pub use ureq_transport::UreqTransport;

use std::sync::Arc;

use crate::error::TransportError;
use crate::http::{HttpRequest, ResponseMetadata};
use crate::token::Cancellable;

/// Everything a transport observed for one exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub body: Option<Vec<u8>>,
    pub error: Option<TransportError>,
    /// Absent when no response arrived at all.
    pub metadata: Option<ResponseMetadata>,
}

impl RawResponse {
    pub fn new(status: u16, body: Option<Vec<u8>>) -> Self {
        Self {
            body,
            error: None,
            metadata: Some(ResponseMetadata::new(status)),
        }
    }

    /// An exchange that failed before any response was received.
    pub fn failed(error: TransportError) -> Self {
        Self {
            body: None,
            error: Some(error),
            metadata: None,
        }
    }
}

/// Receives the transport's result. Called at most once.
pub type TransportCallback = Box<dyn FnOnce(RawResponse) + Send + 'static>;

/// Executes built requests asynchronously.
pub trait Transport: Send + Sync {
    /// Start the exchange without blocking and return its operation handle.
    fn send(&self, request: HttpRequest, callback: TransportCallback) -> Arc<dyn Cancellable>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest, callback: TransportCallback) -> Arc<dyn Cancellable> {
        (**self).send(request, callback)
    }
}
