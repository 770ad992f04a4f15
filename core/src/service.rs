//! Typed decoding on top of a dispatcher.
//!
//! # Design
//! Services expose a dispatcher and get `request_typed` for free through the
//! blanket `TypedRequesting` impl. Decoding is a pure function of the
//! dispatcher's outcome (`decode`), so independent calls can decode
//! concurrently without sharing anything.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::classify::Outcome;
use crate::descriptor::RequestDescriptor;
use crate::dispatcher::RequestDispatching;
use crate::error::NetworkingError;
use crate::executor::Executor;
use crate::token::RequestToken;

/// An API service backed by a dispatcher.
pub trait NetworkingService {
    fn dispatcher(&self) -> &dyn RequestDispatching;
}

/// JSON-decoded requests for any `NetworkingService`.
pub trait TypedRequesting: NetworkingService {
    /// Execute `request` and decode a successful payload into `T`.
    fn request_typed<T, F>(&self, request: &dyn RequestDescriptor, completion: F) -> Option<RequestToken>
    where
        T: DeserializeOwned + 'static,
        F: FnOnce(Result<T, NetworkingError>) + Send + 'static,
    {
        self.dispatcher()
            .execute(request, Box::new(move |outcome| completion(decode(outcome))))
    }

    /// Like `request_typed`, delivering on `executor`.
    fn request_typed_on<T, F>(
        &self,
        executor: Arc<dyn Executor>,
        request: &dyn RequestDescriptor,
        completion: F,
    ) -> Option<RequestToken>
    where
        T: DeserializeOwned + 'static,
        F: FnOnce(Result<T, NetworkingError>) + Send + 'static,
    {
        self.dispatcher().execute_on(
            executor,
            request,
            Box::new(move |outcome| completion(decode(outcome))),
        )
    }
}

impl<S: NetworkingService + ?Sized> TypedRequesting for S {}

/// Decode a dispatcher outcome into `T`.
///
/// Dispatcher failures are wrapped unchanged in `NetworkingError::UrlRequest`;
/// a success without payload is `NoData`.
pub fn decode<T: DeserializeOwned>(outcome: Outcome) -> Result<T, NetworkingError> {
    let body = outcome?.ok_or(NetworkingError::NoData)?;
    serde_json::from_slice(&body).map_err(NetworkingError::Serialization)
}

/// A plain service around any dispatcher.
pub struct Service<D> {
    dispatcher: D,
}

impl<D: RequestDispatching> Service<D> {
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }
}

impl<D: RequestDispatching> NetworkingService for Service<D> {
    fn dispatcher(&self) -> &dyn RequestDispatching {
        &self.dispatcher
    }
}
