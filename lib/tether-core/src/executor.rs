//! Request execution capabilities.
//!
//! - [`Executor`] - "do a request": the capability of a client
//! - [`Transport`] - "round-trip a request": the capability of a raw transport
//! - [`ExecutorFn`] - one closure satisfying both
//!
//! Both traits have the same shape and are object safe, so any implementation
//! can be shared behind an [`Arc`] and wrapped by middlewares.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Future returned by [`Executor::execute`] and [`Transport::round_trip`].
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// Shared, type-erased [`Executor`].
pub type SharedExecutor = Arc<dyn Executor>;

/// Shared, type-erased [`Transport`].
pub type SharedTransport = Arc<dyn Transport>;

/// Performs HTTP requests, like a client.
///
/// # Errors
///
/// Implementations fail only on transport-level problems (connection, TLS,
/// deadline, ...). A response with a non-2xx status is still `Ok`.
pub trait Executor: Send + Sync {
    /// Execute an HTTP request and return the response.
    fn execute(&self, request: Request) -> ResponseFuture;
}

/// Sends a single HTTP request and returns its response, like a raw transport.
///
/// A transport never follows redirects: the client hosting it calls
/// [`Transport::round_trip`] once per hop.
pub trait Transport: Send + Sync {
    /// Send the request over the wire.
    fn round_trip(&self, request: Request) -> ResponseFuture;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, request: Request) -> ResponseFuture {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn round_trip(&self, request: Request) -> ResponseFuture {
        (**self).round_trip(request)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, request: Request) -> ResponseFuture {
        (**self).execute(request)
    }
}

// ============================================================================
// Function adapter
// ============================================================================

/// Adapter turning a closure into both an [`Executor`] and a [`Transport`].
///
/// # Example
///
/// ```
/// use tether_core::{Error, Executor, ExecutorFn, Method, Request, Response};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let failing = ExecutorFn::new(|_request: Request| async {
///     Err::<Response, _>(Error::connection("executor failure"))
/// });
///
/// let request = Request::new(Method::Get, "https://example.com".parse().unwrap());
/// let err = failing.execute(request).await.unwrap_err();
/// assert_eq!(err.to_string(), "connection error: executor failure");
/// # }
/// ```
#[derive(Clone)]
pub struct ExecutorFn<F> {
    f: F,
}

impl<F> ExecutorFn<F> {
    /// Wrap a closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }

    /// The wrapped closure.
    pub fn into_inner(self) -> F {
        self.f
    }
}

impl<F> fmt::Debug for ExecutorFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorFn").finish_non_exhaustive()
    }
}

impl<F, Fut> ExecutorFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    /// Call the closure, boxing its future.
    pub fn call(&self, request: Request) -> ResponseFuture {
        Box::pin((self.f)(request))
    }
}

impl<F, Fut> Executor for ExecutorFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn execute(&self, request: Request) -> ResponseFuture {
        self.call(request)
    }
}

impl<F, Fut> Transport for ExecutorFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn round_trip(&self, request: Request) -> ResponseFuture {
        self.call(request)
    }
}

/// Use a [`Transport`] where an [`Executor`] is expected.
#[derive(Clone)]
pub struct TransportExecutor {
    transport: SharedTransport,
}

impl TransportExecutor {
    /// Wrap a shared transport.
    #[must_use]
    pub const fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }
}

impl fmt::Debug for TransportExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportExecutor").finish_non_exhaustive()
    }
}

impl Executor for TransportExecutor {
    fn execute(&self, request: Request) -> ResponseFuture {
        self.transport.round_trip(request)
    }
}

/// Use an [`Executor`] where a [`Transport`] is expected.
#[derive(Clone)]
pub struct ExecutorTransport {
    executor: SharedExecutor,
}

impl ExecutorTransport {
    /// Wrap a shared executor.
    #[must_use]
    pub const fn new(executor: SharedExecutor) -> Self {
        Self { executor }
    }
}

impl fmt::Debug for ExecutorTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorTransport").finish_non_exhaustive()
    }
}

impl Transport for ExecutorTransport {
    fn round_trip(&self, request: Request) -> ResponseFuture {
        self.executor.execute(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};

    use super::*;
    use crate::{Error, Method};

    fn request() -> Request {
        let_assert!(Ok(url) = "https://example.com/hello".parse::<url::Url>());
        Request::new(Method::Get, url)
    }

    #[tokio::test]
    async fn executor_fn_is_an_executor_and_a_transport() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let adapter = ExecutorFn::new(move |_request: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(Response::new(200, http::HeaderMap::new(), "Hello, world!")) }
        });

        let_assert!(Ok(response) = adapter.execute(request()).await);
        check!(response.status() == 200);

        let_assert!(Ok(response) = adapter.round_trip(request()).await);
        let_assert!(Ok(text) = response.text().await);
        check!(text == "Hello, world!");

        check!(calls.load(Ordering::SeqCst) == 2);
    }

    #[tokio::test]
    async fn executor_fn_failure_is_returned_verbatim() {
        let adapter = ExecutorFn::new(|_request: Request| async {
            Err::<Response, _>(Error::connection("doer failure"))
        });

        let_assert!(Err(err) = adapter.execute(request()).await);
        check!(err.to_string() == "connection error: doer failure");
    }

    #[tokio::test]
    async fn adapters_bridge_both_capabilities() {
        let base: SharedExecutor = Arc::new(ExecutorFn::new(|request: Request| async move {
            Ok::<_, Error>(Response::new(
                200,
                http::HeaderMap::new(),
                request.url().path().to_string(),
            ))
        }));

        let transport: SharedTransport = Arc::new(ExecutorTransport::new(base));
        let executor = TransportExecutor::new(transport);

        let_assert!(Ok(response) = executor.execute(request()).await);
        let_assert!(Ok(text) = response.text().await);
        check!(text == "/hello");
    }
}
