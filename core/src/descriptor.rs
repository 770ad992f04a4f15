//! Declarative request descriptions.
//!
//! # Design
//! A `RequestDescriptor` states what a caller wants (where, how, with which
//! parameters and headers) and nothing about how it gets on the wire. APIs
//! with a fixed set of endpoints usually implement it on an enum with one
//! variant per endpoint; `SimpleRequest` covers one-off calls.

use std::sync::Arc;

use serde_json::{Map, Value};
use url::Url;

use crate::adapter::RequestAdapter;
use crate::http::{Headers, HttpMethod};

/// Parameters sent along with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// JSON-encoded into the request body.
    Body(Map<String, Value>),
    /// Replaces the whole query string of the final URL.
    Url(Headers),
}

/// Immutable description of a request, consumed by a `RequestBuilder`.
pub trait RequestDescriptor: Send + Sync {
    fn base_url(&self) -> &Url;

    /// Appended to the base URL when present.
    fn path(&self) -> Option<&str> {
        None
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn parameters(&self) -> Option<&Parameters> {
        None
    }

    fn headers(&self) -> Option<&Headers> {
        None
    }

    /// Adapter carried by the request itself. A dispatcher-level adapter
    /// replaces it.
    fn adapter(&self) -> Option<Arc<dyn RequestAdapter>> {
        None
    }
}

/// A request where only the base URL is required.
#[derive(Clone)]
pub struct SimpleRequest {
    pub base_url: Url,
    pub path: Option<String>,
    pub method: HttpMethod,
    pub parameters: Option<Parameters>,
    pub headers: Option<Headers>,
    pub adapter: Option<Arc<dyn RequestAdapter>>,
}

impl SimpleRequest {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            path: None,
            method: HttpMethod::Get,
            parameters: None,
            headers: None,
            adapter: None,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_body(self, body: Map<String, Value>) -> Self {
        self.with_parameters(Parameters::Body(body))
    }

    pub fn with_query<K, V>(self, query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let query = query
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.with_parameters(Parameters::Url(query))
    }

    /// Add a header, overriding an earlier value for the same key.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn RequestAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }
}

impl std::fmt::Debug for SimpleRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleRequest")
            .field("base_url", &self.base_url.as_str())
            .field("path", &self.path)
            .field("method", &self.method)
            .field("parameters", &self.parameters)
            .field("headers", &self.headers)
            .field("adapter", &self.adapter.is_some())
            .finish()
    }
}

impl RequestDescriptor for SimpleRequest {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    fn adapter(&self) -> Option<Arc<dyn RequestAdapter>> {
        self.adapter.clone()
    }
}
