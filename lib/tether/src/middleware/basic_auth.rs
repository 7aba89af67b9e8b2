//! Basic authentication middleware.
//!
//! This middleware adds an `Authorization: Basic <base64(user:pass)>` header
//! to all outgoing requests.

use base64::Engine;
use http::header::{AUTHORIZATION, HeaderValue};
use tower::Layer;

use super::header::rejecting;
use crate::chain::Middleware;
use crate::{Error, Executor, Request, ResponseFuture, Result, SharedExecutor};

/// Layer that adds basic authentication to requests.
///
/// # Example
///
/// ```ignore
/// use tether::Middleware;
/// use tether::middleware::BasicAuthLayer;
///
/// let auth = Middleware::from_layer(BasicAuthLayer::new("username", "password")?);
/// ```
#[derive(Debug, Clone)]
pub struct BasicAuthLayer {
    /// `Basic <base64(username:password)>`, marked sensitive.
    credentials: HeaderValue,
}

impl BasicAuthLayer {
    /// Create a new basic auth layer with the given username and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the encoded credentials are not a
    /// valid header value.
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Result<Self> {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);

        let mut credentials = HeaderValue::try_from(format!("Basic {encoded}"))
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        credentials.set_sensitive(true);

        Ok(Self { credentials })
    }
}

impl Layer<SharedExecutor> for BasicAuthLayer {
    type Service = BasicAuth;

    fn layer(&self, inner: SharedExecutor) -> Self::Service {
        BasicAuth {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

/// Executor that adds basic authentication to requests.
#[derive(Clone)]
pub struct BasicAuth {
    inner: SharedExecutor,
    credentials: HeaderValue,
}

impl Executor for BasicAuth {
    fn execute(&self, mut request: Request) -> ResponseFuture {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.credentials.clone());

        self.inner.execute(request)
    }
}

/// Set `Authorization: Basic <base64(username:password)>`.
///
/// Always installed, empty credentials included.
#[must_use]
pub fn basic_auth(username: &str, password: &str) -> Middleware {
    match BasicAuthLayer::new(username, password) {
        Ok(layer) => Middleware::from_layer(layer),
        Err(err) => rejecting(err.to_string()),
    }
}
