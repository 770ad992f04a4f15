//! Staged construction of wire-ready requests.
//!
//! # Design
//! A builder is created per request, staged through chained setters and
//! finished with `build`. `build` resolves the address first, then applies
//! body or query parameters, then headers, and finally runs the adapter.
//! Only one adapter is held: registering another replaces it.
//!
//! Builders are single-use and not shared between threads; the dispatcher
//! creates a fresh one for every call.

use std::sync::Arc;

use url::Url;

use crate::adapter::RequestAdapter;
use crate::descriptor::{Parameters, RequestDescriptor};
use crate::error::BuildError;
use crate::http::{Headers, HttpMethod, HttpRequest};

/// Turns a request description into an `HttpRequest`.
///
/// The dispatcher is generic over its builder so alternative builders (and
/// test doubles) can be injected.
pub trait RequestBuilder: Sized {
    /// Start from everything a descriptor states, including its adapter.
    fn from_descriptor(descriptor: &dyn RequestDescriptor) -> Self;

    fn with_base_url(base_url: Url, path: Option<String>) -> Self;

    fn method(&mut self, method: HttpMethod) -> &mut Self;

    fn path(&mut self, path: impl Into<String>) -> &mut Self;

    fn headers(&mut self, headers: Option<Headers>) -> &mut Self;

    fn parameters(&mut self, parameters: Option<Parameters>) -> &mut Self;

    /// Register the adapter, replacing any previously registered one.
    fn adapter(&mut self, adapter: Arc<dyn RequestAdapter>) -> &mut Self;

    fn build(&self) -> Result<HttpRequest, BuildError>;
}

/// The builder used by `Dispatcher` unless another one is chosen.
#[derive(Clone)]
pub struct DefaultRequestBuilder {
    base_url: Url,
    path: Option<String>,
    method: HttpMethod,
    headers: Option<Headers>,
    parameters: Option<Parameters>,
    adapter: Option<Arc<dyn RequestAdapter>>,
}

impl RequestBuilder for DefaultRequestBuilder {
    fn from_descriptor(descriptor: &dyn RequestDescriptor) -> Self {
        Self {
            base_url: descriptor.base_url().clone(),
            path: descriptor.path().map(str::to_owned),
            method: descriptor.method(),
            headers: descriptor.headers().cloned(),
            parameters: descriptor.parameters().cloned(),
            adapter: descriptor.adapter(),
        }
    }

    fn with_base_url(base_url: Url, path: Option<String>) -> Self {
        Self {
            base_url,
            path,
            method: HttpMethod::Get,
            headers: None,
            parameters: None,
            adapter: None,
        }
    }

    fn method(&mut self, method: HttpMethod) -> &mut Self {
        self.method = method;
        self
    }

    fn path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = Some(path.into());
        self
    }

    fn headers(&mut self, headers: Option<Headers>) -> &mut Self {
        self.headers = headers;
        self
    }

    fn parameters(&mut self, parameters: Option<Parameters>) -> &mut Self {
        self.parameters = parameters;
        self
    }

    fn adapter(&mut self, adapter: Arc<dyn RequestAdapter>) -> &mut Self {
        self.adapter = Some(adapter);
        self
    }

    fn build(&self) -> Result<HttpRequest, BuildError> {
        let url = match &self.path {
            Some(path) => append_path(&self.base_url, path)?,
            None => self.base_url.clone(),
        };

        let mut request = HttpRequest::new(self.method, url);

        match &self.parameters {
            Some(Parameters::Body(body)) => {
                request.body = Some(serde_json::to_vec(body)?);
            }
            Some(Parameters::Url(query)) => {
                request.url.set_query(None);
                if !query.is_empty() {
                    request.url.query_pairs_mut().extend_pairs(query);
                }
            }
            None => {}
        }

        if let Some(headers) = &self.headers {
            for (name, value) in headers {
                request.set_header(name.as_str(), value.as_str());
            }
        }

        match &self.adapter {
            Some(adapter) => adapter.adapt(request).map_err(BuildError::Adapter),
            None => Ok(request),
        }
    }
}

/// Append `path` as path segments of `base`, keeping `base`'s own segments.
///
/// Leading slashes and empty interior segments of `path` are ignored, while a
/// trailing slash is kept. An empty path leaves `base` untouched.
fn append_path(base: &Url, path: &str) -> Result<Url, BuildError> {
    if base.cannot_be_a_base() {
        return Err(BuildError::CannotBeABase(base.to_string()));
    }

    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Ok(base.clone());
    }

    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| BuildError::CannotBeABase(base.to_string()))?;
        segments
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        if path.ends_with('/') {
            segments.push("");
        }
    }
    Ok(url)
}
