//! Late-stage request mutation.

use crate::error::BoxError;
use crate::http::HttpRequest;

/// Inspects a built request and returns it, adapted if necessary.
///
/// Runs as the last step of `RequestBuilder::build`. Returning an error
/// aborts the build.
pub trait RequestAdapter: Send + Sync {
    fn adapt(&self, request: HttpRequest) -> Result<HttpRequest, BoxError>;
}

/// Injects `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl RequestAdapter for BearerAuth {
    fn adapt(&self, mut request: HttpRequest) -> Result<HttpRequest, BoxError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err("bearer token is empty".into());
        }
        request.set_header("Authorization", format!("Bearer {token}"));
        Ok(request)
    }
}
