//! Executes request descriptors against a transport.
//!
//! # Design
//! `execute_on` builds the request, submits it and returns a token before the
//! transport finishes. The transport's reply is classified and handed to the
//! caller's completion on the requested executor.
//!
//! Every call delivers exactly one outcome. The completion travels inside a
//! `Delivery` guard: if a transport drops its callback without calling it, the
//! guard still delivers `InvalidResponse`.
//!
//! A `Dispatcher` holds only configuration fixed at construction, so a single
//! instance can serve any number of concurrent callers.

use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::adapter::RequestAdapter;
use crate::builder::{DefaultRequestBuilder, RequestBuilder};
use crate::classify::{classify, Outcome};
use crate::descriptor::RequestDescriptor;
use crate::error::RequestError;
use crate::executor::{Executor, Inline};
use crate::token::RequestToken;
use crate::transport::{RawResponse, Transport};

/// Receives the outcome of one dispatched request.
pub type Completion = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// Executes requests and reports their byte-level outcome.
pub trait RequestDispatching: Send + Sync {
    /// Execute `request`, delivering the outcome on `executor`.
    ///
    /// Returns `None` when the request could not be built; the completion
    /// still receives `RequestBuilderFailed`.
    fn execute_on(
        &self,
        executor: Arc<dyn Executor>,
        request: &dyn RequestDescriptor,
        completion: Completion,
    ) -> Option<RequestToken>;

    /// Execute `request`, delivering the outcome on the default executor.
    fn execute(&self, request: &dyn RequestDescriptor, completion: Completion) -> Option<RequestToken>;
}

/// Dispatcher over a `Transport`, building requests with `B`.
pub struct Dispatcher<T, B = DefaultRequestBuilder> {
    transport: T,
    adapter: Option<Arc<dyn RequestAdapter>>,
    executor: Arc<dyn Executor>,
    builder: PhantomData<fn() -> B>,
}

impl<T: Transport> Dispatcher<T> {
    /// Dispatcher with the default builder, no adapter, and inline delivery.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            adapter: None,
            executor: Arc::new(Inline),
            builder: PhantomData,
        }
    }
}

impl<T: Transport, B: RequestBuilder> Dispatcher<T, B> {
    /// Switch to another builder type.
    pub fn with_builder<C: RequestBuilder>(self) -> Dispatcher<T, C> {
        Dispatcher {
            transport: self.transport,
            adapter: self.adapter,
            executor: self.executor,
            builder: PhantomData,
        }
    }

    /// Adapter registered on every builder, replacing any adapter carried by
    /// the request itself.
    pub fn with_adapter(mut self, adapter: Arc<dyn RequestAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Executor used by `execute`.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport, B: RequestBuilder> RequestDispatching for Dispatcher<T, B> {
    fn execute_on(
        &self,
        executor: Arc<dyn Executor>,
        request: &dyn RequestDescriptor,
        completion: Completion,
    ) -> Option<RequestToken> {
        let request_id = Uuid::new_v4();
        let delivery = Delivery::new(request_id, executor, completion);

        let mut builder = B::from_descriptor(request);
        if let Some(adapter) = &self.adapter {
            builder.adapter(Arc::clone(adapter));
        }

        let built = match builder.build() {
            Ok(built) => built,
            Err(err) => {
                tracing::warn!(%request_id, error = %err, "request builder failed");
                delivery.deliver(Err(RequestError::RequestBuilderFailed(err)));
                return None;
            }
        };

        let span = tracing::debug_span!(
            "dispatch",
            %request_id,
            method = %built.method,
            url = %built.url
        );
        let _enter = span.enter();
        tracing::debug!("submitting request");

        let callback_span = span.clone();
        let operation = self.transport.send(
            built,
            Box::new(move |raw: RawResponse| {
                let _enter = callback_span.enter();
                let outcome = match raw.metadata {
                    Some(metadata) => classify(raw.body, raw.error, metadata.status),
                    None => Err(RequestError::InvalidResponse),
                };
                tracing::debug!(success = outcome.is_ok(), "request finished");
                delivery.deliver(outcome);
            }),
        );

        Some(RequestToken::new(request_id, &operation))
    }

    fn execute(&self, request: &dyn RequestDescriptor, completion: Completion) -> Option<RequestToken> {
        self.execute_on(Arc::clone(&self.executor), request, completion)
    }
}

/// Delivers a completion exactly once on its executor.
struct Delivery {
    request_id: Uuid,
    executor: Arc<dyn Executor>,
    completion: Option<Completion>,
}

impl Delivery {
    fn new(request_id: Uuid, executor: Arc<dyn Executor>, completion: Completion) -> Self {
        Self {
            request_id,
            executor,
            completion: Some(completion),
        }
    }

    fn deliver(mut self, outcome: Outcome) {
        if let Some(completion) = self.completion.take() {
            self.executor.execute(Box::new(move || completion(outcome)));
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            tracing::warn!(
                request_id = %self.request_id,
                "transport dropped its callback without a response"
            );
            self.executor
                .execute(Box::new(move || completion(Err(RequestError::InvalidResponse))));
        }
    }
}
