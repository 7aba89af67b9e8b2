//! The [`Client`] wrapper: an executor with a middleware chain.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower_service::Service;

use crate::chain::{Middleware, compose};
use crate::{Error, Executor, Request, Response, ResponseFuture, Result, SharedExecutor};

/// An [`Executor`] wrapped by an ordered chain of middlewares.
///
/// The chain is composed once, at construction. A `Client` is never mutated:
/// [`Client::with`] derives a new client from the same base executor and the
/// parent middlewares followed by the new ones.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tether::{Client, Error, ExecutorFn, Request, Response, middleware};
///
/// let base = ExecutorFn::new(|_request: Request| async {
///     Ok::<_, Error>(Response::with_status(204))
/// });
/// let client = Client::new(
///     base,
///     [middleware::recover(), middleware::user_agent("tether/0.1")],
/// );
///
/// // Inherits recover and user agent, then adds a timeout
/// let bounded = client.with([middleware::timeout(Duration::from_secs(5))]);
/// assert_eq!(bounded.middlewares().len(), 3);
/// assert_eq!(client.middlewares().len(), 2);
/// ```
#[derive(Clone)]
pub struct Client {
    base: SharedExecutor,
    middlewares: Vec<Middleware>,
    chain: SharedExecutor,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Wrap `base` with `middlewares`, first one outermost.
    pub fn new<E>(base: E, middlewares: impl IntoIterator<Item = Middleware>) -> Self
    where
        E: Executor + 'static,
    {
        Self::from_shared(Arc::new(base), middlewares)
    }

    /// Same as [`Client::new`] for an already shared executor.
    pub fn from_shared(
        base: SharedExecutor,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        let middlewares: Vec<_> = middlewares.into_iter().collect();
        let chain = compose(Arc::clone(&base), &middlewares);
        Self {
            base,
            middlewares,
            chain,
        }
    }

    /// Derive a client running this client's middlewares, then `middlewares`.
    ///
    /// `self` is left untouched.
    #[must_use]
    pub fn with(&self, middlewares: impl IntoIterator<Item = Middleware>) -> Self {
        let combined = self.middlewares.iter().cloned().chain(middlewares);
        Self::from_shared(Arc::clone(&self.base), combined)
    }

    /// The executor at the bottom of the chain.
    #[must_use]
    pub const fn base(&self) -> &SharedExecutor {
        &self.base
    }

    /// The middlewares, outermost first, including absent ones.
    #[must_use]
    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }
}

impl Executor for Client {
    fn execute(&self, request: Request) -> ResponseFuture {
        self.chain.execute(request)
    }
}

impl Service<Request> for Client {
    type Response = Response;
    type Error = Error;
    type Future = ResponseFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.chain.execute(request)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use http::HeaderMap;
    use tower::ServiceExt;

    use super::*;
    use crate::{ExecutorFn, Method, middleware};

    fn echo_header() -> ExecutorFn<impl Fn(Request) -> ResponseFuture + Send + Sync> {
        ExecutorFn::new(|request: Request| -> ResponseFuture {
            let value = request.header("x-env").unwrap_or_default().to_string();
            Box::pin(async move { Ok(Response::new(200, HeaderMap::new(), value)) })
        })
    }

    fn request() -> Request {
        let_assert!(Ok(url) = "https://example.com/".parse::<url::Url>());
        Request::new(Method::Get, url)
    }

    #[tokio::test]
    async fn no_middleware_calls_base() {
        let client = Client::new(echo_header(), []);
        check!(Arc::ptr_eq(&client.chain, client.base()));

        let_assert!(Ok(response) = client.execute(request()).await);
        check!(response.status() == 200);
    }

    #[tokio::test]
    async fn derived_client_does_not_alter_parent() {
        let parent = Client::new(echo_header(), [middleware::set_header("x-env", "parent")]);
        let child = parent.with([middleware::set_header("x-env", "child")]);

        let_assert!(Ok(response) = parent.execute(request()).await);
        let_assert!(Ok(text) = response.text().await);
        check!(text == "parent");

        let_assert!(Ok(response) = child.execute(request()).await);
        let_assert!(Ok(text) = response.text().await);
        check!(text == "child");

        check!(parent.middlewares().len() == 1);
        check!(child.middlewares().len() == 2);
        check!(Arc::ptr_eq(parent.base(), child.base()));
    }

    #[tokio::test]
    async fn client_is_a_tower_service() {
        let client = Client::new(echo_header(), [middleware::set_header("x-env", "tower")]);

        let_assert!(Ok(response) = client.oneshot(request()).await);
        let_assert!(Ok(text) = response.text().await);
        check!(text == "tower");
    }

    #[test]
    fn client_is_debug() {
        let client = Client::new(echo_header(), [Middleware::absent()]);
        let debug = format!("{client:?}");
        check!(debug.contains("Client"));
        check!(debug.contains("absent: true"));
    }
}
