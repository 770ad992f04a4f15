//! Asynchronous HTTP request pipeline.
//!
//! # Overview
//! Turns a declarative `RequestDescriptor` into a wire-ready `HttpRequest`,
//! executes it through an injected `Transport`, classifies the raw reply into
//! a typed outcome and, on request, decodes successful payloads into caller
//! types.
//!
//! # Design
//! - `DefaultRequestBuilder` resolves address, parameters, headers and the
//!   single registered adapter, in that order.
//! - `Dispatcher` returns a `RequestToken` before the transport finishes and
//!   delivers exactly one outcome per call on the requested `Executor`.
//! - `classify` is pure; precedence of status codes and transport errors is
//!   fixed there.
//! - `TypedRequesting` layers JSON decoding on any `NetworkingService`.
//! - The transport is a trait; `UreqTransport` is the bundled implementation
//!   and tests plug in stubs.

pub mod adapter;
pub mod builder;
pub mod classify;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod http;
pub mod service;
pub mod token;
pub mod transport;

pub use adapter::{BearerAuth, RequestAdapter};
pub use builder::{DefaultRequestBuilder, RequestBuilder};
pub use classify::{classify, Outcome};
pub use config::Configuration;
pub use descriptor::{Parameters, RequestDescriptor, SimpleRequest};
pub use dispatcher::{Completion, Dispatcher, RequestDispatching};
pub use error::{BoxError, BuildError, ConfigError, NetworkingError, RequestError, TransportError};
pub use executor::{Executor, Inline, Job};
pub use http::{Headers, HttpMethod, HttpRequest, ResponseMetadata, DEFAULT_TIMEOUT};
pub use service::{decode, NetworkingService, Service, TypedRequesting};
pub use token::{Cancellable, RequestToken};
pub use transport::{RawResponse, Transport, TransportCallback, UreqTransport};
