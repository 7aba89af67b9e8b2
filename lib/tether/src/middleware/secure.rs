//! HTTPS enforcement middleware.
//!
//! Installed on a [`LayeredTransport`](crate::LayeredTransport) it also checks
//! every redirect target followed by [`HttpClient`](crate::HttpClient), which
//! only ever sees the scheme of the first URL.

use tower::Layer;
use tracing::warn;

use crate::{Error, Executor, Request, Response, ResponseFuture, SharedExecutor};

/// Layer rejecting requests whose scheme is not `https`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureLayer;

impl Layer<SharedExecutor> for SecureLayer {
    type Service = Secure;

    fn layer(&self, inner: SharedExecutor) -> Self::Service {
        Secure { inner }
    }
}

/// Executor failing with [`Error::InsecureScheme`] before any I/O for
/// non-`https` URLs.
#[derive(Clone)]
pub struct Secure {
    inner: SharedExecutor,
}

impl Executor for Secure {
    fn execute(&self, request: Request) -> ResponseFuture {
        if request.url().scheme() != "https" {
            warn!(url = %request.url(), "insecure scheme rejected");
            return Box::pin(async { Err::<Response, _>(Error::InsecureScheme) });
        }

        self.inner.execute(request)
    }
}
