//! The [`LayeredTransport`] wrapper: a transport with a middleware chain.
//!
//! Installed inside an [`HttpClient`](crate::HttpClient), the chain runs once
//! per hop, redirects included.

use std::fmt;
use std::sync::Arc;

use crate::chain::{Middleware, compose};
use crate::{
    Executor, Request, ResponseFuture, SharedExecutor, SharedTransport, Transport,
    TransportExecutor,
};

/// A [`Transport`] wrapped by an ordered chain of middlewares.
///
/// Composition and derivation are the same as for [`Client`](crate::Client);
/// only the exposed capability differs.
///
/// # Example
///
/// ```
/// use tether::{HttpClient, LayeredTransport, middleware};
///
/// let transport = LayeredTransport::new(tether::HyperTransport::new(), [middleware::secure()]);
/// let client = HttpClient::with_transport(transport);
/// # drop(client);
/// ```
#[derive(Clone)]
pub struct LayeredTransport {
    base: SharedTransport,
    middlewares: Vec<Middleware>,
    chain: SharedExecutor,
}

impl fmt::Debug for LayeredTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredTransport")
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}

impl LayeredTransport {
    /// Wrap `base` with `middlewares`, first one outermost.
    pub fn new<T>(base: T, middlewares: impl IntoIterator<Item = Middleware>) -> Self
    where
        T: Transport + 'static,
    {
        Self::from_shared(Arc::new(base), middlewares)
    }

    /// Same as [`LayeredTransport::new`] for an already shared transport.
    pub fn from_shared(
        base: SharedTransport,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        let middlewares: Vec<_> = middlewares.into_iter().collect();
        let innermost: SharedExecutor = Arc::new(TransportExecutor::new(Arc::clone(&base)));
        let chain = compose(innermost, &middlewares);
        Self {
            base,
            middlewares,
            chain,
        }
    }

    /// Derive a transport running this transport's middlewares, then
    /// `middlewares`.
    ///
    /// `self` is left untouched.
    #[must_use]
    pub fn with(&self, middlewares: impl IntoIterator<Item = Middleware>) -> Self {
        let combined = self.middlewares.iter().cloned().chain(middlewares);
        Self::from_shared(Arc::clone(&self.base), combined)
    }

    /// The transport at the bottom of the chain.
    #[must_use]
    pub const fn base(&self) -> &SharedTransport {
        &self.base
    }

    /// The middlewares, outermost first, including absent ones.
    #[must_use]
    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }
}

impl Transport for LayeredTransport {
    fn round_trip(&self, request: Request) -> ResponseFuture {
        self.chain.execute(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};

    use super::*;
    use crate::{Error, ExecutorFn, Method, Response, middleware};

    fn request(url: &str) -> Request {
        let_assert!(Ok(url) = url.parse::<url::Url>());
        Request::new(Method::Get, url)
    }

    #[tokio::test]
    async fn middlewares_run_before_the_transport() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let base = ExecutorFn::new(move |request: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            let agent = request.header("user-agent").map(str::to_string);
            async move {
                check!(agent.as_deref() == Some("tether-test"));
                Ok::<_, Error>(Response::with_status(200))
            }
        });

        let transport = LayeredTransport::new(base, [middleware::user_agent("tether-test")]);
        let_assert!(Ok(response) = transport.round_trip(request("https://example.com")).await);
        check!(response.status() == 200);
        check!(hits.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn derived_transport_keeps_parent_chain() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let base = ExecutorFn::new(move |_request: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(Response::with_status(200)) }
        });

        let parent = LayeredTransport::new(base, []);
        let child = parent.with([middleware::secure()]);

        let_assert!(Ok(_) = parent.round_trip(request("http://example.com")).await);
        let_assert!(Err(err) = child.round_trip(request("http://example.com")).await);
        check!(err.is_insecure_scheme());
        check!(hits.load(Ordering::SeqCst) == 1);
        check!(Arc::ptr_eq(parent.base(), child.base()));
    }
}
