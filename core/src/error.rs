//! Error types for the request pipeline.
//!
//! # Design
//! Errors are layered the same way the pipeline is. `BuildError` covers the
//! builder's terminal step, `TransportError` is whatever the wire reported,
//! `RequestError` is the classified byte-level failure delivered by the
//! dispatcher, and `NetworkingError` is what the typed decoding layer hands
//! to callers. Every one of them travels through a completion; none of them
//! is ever raised as a panic.

use serde_json::{Map, Value};
use thiserror::Error;

/// Boxed error returned by adapters and other caller-supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of `RequestBuilder::build`.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The base URL cannot take path segments (e.g. `mailto:` or `data:`).
    #[error("base url `{0}` cannot be used with a path")]
    CannotBeABase(String),

    /// The body parameters could not be encoded as JSON.
    #[error("body serialization failed: {0}")]
    Body(#[from] serde_json::Error),

    /// The registered adapter rejected the request.
    #[error("adapter failed: {0}")]
    Adapter(#[source] BoxError),
}

/// Error reported by a transport alongside (or instead of) a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request was cancelled")]
    Cancelled,

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Classified failure of one dispatched request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The builder's terminal step failed; the transport was never called.
    #[error("the request builder failed")]
    RequestBuilderFailed(#[source] BuildError),

    /// The transport finished without any response metadata.
    #[error("the transport returned no response")]
    InvalidResponse,

    /// Non-2xx response that carried nothing worth surfacing.
    #[error("unknown error")]
    Unknown,

    /// A 4xx response with a text payload, surfaced verbatim.
    #[error("request failed with payload: {}", String::from_utf8_lossy(.body))]
    WithPayload {
        body: Vec<u8>,
        cause: Option<TransportError>,
    },
}

impl RequestError {
    /// Stable numeric code, negative to keep clear of HTTP status codes.
    pub fn code(&self) -> i32 {
        match self {
            RequestError::Unknown => -1,
            RequestError::RequestBuilderFailed(_) => -2,
            RequestError::WithPayload { .. } => -3,
            RequestError::InvalidResponse => -4,
        }
    }

    /// The payload of a `WithPayload` error parsed as a JSON object.
    ///
    /// Returns `None` for other variants and for payloads that are not a JSON
    /// object.
    pub fn error_json(&self) -> Option<Map<String, Value>> {
        match self {
            RequestError::WithPayload { body, .. } => {
                match serde_json::from_slice::<Value>(body).ok()? {
                    Value::Object(map) => Some(map),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Errors delivered by the typed decoding layer.
#[derive(Debug, Error)]
pub enum NetworkingError {
    /// The dispatcher reported a failure; kept unchanged.
    #[error("there was an error in the request: {0}")]
    UrlRequest(#[from] RequestError),

    /// The payload could not be decoded into the requested type.
    #[error("a serialization error has occurred: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The request succeeded but carried no payload to decode.
    #[error("no data was found")]
    NoData,
}

impl NetworkingError {
    pub fn code(&self) -> i32 {
        match self {
            NetworkingError::UrlRequest(inner) => inner.code(),
            NetworkingError::Serialization(_) => 12,
            NetworkingError::NoData => 13,
        }
    }
}

/// Errors loading a `Configuration`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("default headers must be a JSON object of strings: {0}")]
    InvalidHeaders(#[source] serde_json::Error),
}
