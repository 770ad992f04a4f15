//! Environment configuration: a name, default headers and a base URL.
//!
//! # Design
//! Configuration is static data. It seeds descriptors with the base URL and
//! default headers; per-request headers override defaults by key. Loading
//! goes through a lookup function so tests never touch the process
//! environment.

use url::Url;

use crate::descriptor::SimpleRequest;
use crate::error::ConfigError;
use crate::http::{Headers, HttpMethod};

pub const ENV_NAME: &str = "NETPIPE_ENVIRONMENT";
pub const ENV_BASE_URL: &str = "NETPIPE_BASE_URL";
/// JSON object of string values, e.g. `{"accept":"application/json"}`.
pub const ENV_DEFAULT_HEADERS: &str = "NETPIPE_DEFAULT_HEADERS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Environment name, e.g. production or staging.
    pub name: String,
    pub headers: Headers,
    pub base_url: Url,
}

impl Configuration {
    pub fn new(name: impl Into<String>, headers: Option<Headers>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            headers: headers.unwrap_or_default(),
            base_url,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. The name defaults to `development`
    /// and default headers to none; the base URL is required.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let name = lookup(ENV_NAME).unwrap_or_else(|| "development".to_string());
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let base_url = Url::parse(&base_url)?;
        let headers = match lookup(ENV_DEFAULT_HEADERS) {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(ConfigError::InvalidHeaders)?),
            None => None,
        };
        Ok(Self::new(name, headers, base_url))
    }

    /// Default headers overlaid with `overrides`.
    pub fn merge_headers(&self, overrides: Option<&Headers>) -> Headers {
        let mut merged = self.headers.clone();
        if let Some(overrides) = overrides {
            merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    /// A request against this environment carrying its default headers.
    pub fn request(&self, method: HttpMethod, path: impl Into<String>) -> SimpleRequest {
        let mut request = SimpleRequest::new(self.base_url.clone())
            .with_method(method)
            .with_path(path);
        if !self.headers.is_empty() {
            request.headers = Some(self.headers.clone());
        }
        request
    }

    /// Rebase `request` onto this environment, keeping its own headers on top
    /// of the defaults.
    pub fn apply(&self, mut request: SimpleRequest) -> SimpleRequest {
        request.base_url = self.base_url.clone();
        request.headers = Some(self.merge_headers(request.headers.as_ref()));
        request
    }
}
