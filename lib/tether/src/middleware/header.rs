//! Header setting middlewares.
//!
//! Every helper here overwrites the header on the outgoing request: a value
//! set by an outer middleware is replaced by an inner one, so a derived
//! [`Client`](crate::Client) can override what its parent sets.
//!
//! An empty header *name* yields [`Middleware::absent`]. An empty *value* is
//! valid and sends the header with an empty value, which is a way to suppress
//! a default header.

use std::sync::Arc;

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue, USER_AGENT};
use tower::Layer;
use tracing::warn;

use crate::chain::Middleware;
use crate::{Error, Executor, ExecutorFn, Request, Response, ResponseFuture, Result, SharedExecutor};

/// Layer setting one header on each request.
#[derive(Debug, Clone)]
pub struct SetHeaderLayer {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeaderLayer {
    /// Create a new layer from a parsed header.
    #[must_use]
    pub const fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    /// Create a new layer, validating the header name and value.
    ///
    /// Values of the `Authorization` header are marked sensitive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an invalid name or value.
    pub fn try_new(name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::try_from(name)
            .map_err(|_| Error::invalid_request(format!("invalid header name: {name:?}")))?;
        let mut value = HeaderValue::try_from(value)
            .map_err(|_| Error::invalid_request(format!("invalid value for header {name}")))?;
        value.set_sensitive(name == AUTHORIZATION);

        Ok(Self { name, value })
    }
}

impl Layer<SharedExecutor> for SetHeaderLayer {
    type Service = SetHeader;

    fn layer(&self, inner: SharedExecutor) -> Self::Service {
        SetHeader {
            inner,
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

/// Executor setting one header before forwarding.
#[derive(Clone)]
pub struct SetHeader {
    inner: SharedExecutor,
    name: HeaderName,
    value: HeaderValue,
}

impl Executor for SetHeader {
    fn execute(&self, mut request: Request) -> ResponseFuture {
        request
            .headers_mut()
            .insert(self.name.clone(), self.value.clone());

        self.inner.execute(request)
    }
}

/// Set header `name` to `value`, absent when `name` is empty.
///
/// An invalid name or value yields a middleware failing every request with
/// [`Error::InvalidRequest`], without calling the next executor.
#[must_use]
pub fn set_header(name: &str, value: &str) -> Middleware {
    if name.is_empty() {
        return Middleware::absent();
    }

    match SetHeaderLayer::try_new(name, value) {
        Ok(layer) => Middleware::from_layer(layer),
        Err(err) => {
            warn!(header = name, error = %err, "header middleware rejects every request");
            rejecting(err.to_string())
        }
    }
}

/// Set the `User-Agent` header; an empty value sends an empty header.
#[must_use]
pub fn user_agent(value: &str) -> Middleware {
    set_header(USER_AGENT.as_str(), value)
}

/// Set the `Accept` header.
#[must_use]
pub fn accept(value: &str) -> Middleware {
    set_header(ACCEPT.as_str(), value)
}

/// Set the `Content-Type` header.
#[must_use]
pub fn content_type(value: &str) -> Middleware {
    set_header(CONTENT_TYPE.as_str(), value)
}

/// Set the `Authorization` header verbatim.
#[must_use]
pub fn authorization(value: &str) -> Middleware {
    set_header(AUTHORIZATION.as_str(), value)
}

/// Set `Authorization: Bearer <token>`, absent when `token` is empty.
#[must_use]
pub fn bearer_auth(token: &str) -> Middleware {
    if token.is_empty() {
        return Middleware::absent();
    }

    authorization(&format!("Bearer {token}"))
}

/// Middleware failing every request with [`Error::InvalidRequest`].
pub(crate) fn rejecting(message: String) -> Middleware {
    let message: Arc<str> = Arc::from(message);
    Middleware::new(move |_next: SharedExecutor| -> SharedExecutor {
        let message = Arc::clone(&message);
        Arc::new(ExecutorFn::new(move |_request: Request| {
            let err = Error::invalid_request(&*message);
            async move { Err::<Response, _>(err) }
        }))
    })
}
