//! Middleware values and chain composition.
//!
//! A [`Middleware`] turns one [`Executor`] into another. [`compose`] nests an
//! ordered list of middlewares around a base executor: the first middleware of
//! the list is the outermost one, it runs first on the way in and last on the
//! way out.
//!
//! A middleware may be *absent*. Built-in constructors return
//! [`Middleware::absent`] when their configuration makes them vacuous (empty
//! header name, zero timeout, ...). Absent entries are skipped by [`compose`]
//! without changing the relative order of the others.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};
use tower_service::Service;

use crate::{Error, Executor, Request, Response, ResponseFuture, Result, SharedExecutor};

type WrapFn = dyn Fn(SharedExecutor) -> SharedExecutor + Send + Sync;

/// A transform from one executor into another, or the absent no-op.
///
/// Cloning is cheap: clones share the same transform.
#[derive(Clone, Default)]
pub struct Middleware {
    wrap: Option<Arc<WrapFn>>,
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("absent", &self.is_absent())
            .finish()
    }
}

impl Middleware {
    /// Middleware from a closure wrapping the next executor.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use tether::{Executor, ExecutorFn, Middleware, Request, SharedExecutor};
    ///
    /// let tag = Middleware::new(|next: SharedExecutor| -> SharedExecutor {
    ///     Arc::new(ExecutorFn::new(move |mut request: Request| {
    ///         request
    ///             .headers_mut()
    ///             .insert("x-tag", tether::http::HeaderValue::from_static("tether"));
    ///         next.execute(request)
    ///     }))
    /// });
    /// assert!(!tag.is_absent());
    /// ```
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(SharedExecutor) -> SharedExecutor + Send + Sync + 'static,
    {
        Self {
            wrap: Some(Arc::new(wrap)),
        }
    }

    /// The no-op middleware, skipped during composition.
    #[must_use]
    pub const fn absent() -> Self {
        Self { wrap: None }
    }

    /// Returns `true` for [`Middleware::absent`].
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.wrap.is_none()
    }

    /// Wrap `next`, or return it unchanged when absent.
    #[must_use]
    pub fn wrap(&self, next: SharedExecutor) -> SharedExecutor {
        match &self.wrap {
            Some(wrap) => wrap(next),
            None => next,
        }
    }

    /// Middleware from a tower [`Layer`] producing an [`Executor`].
    ///
    /// Built-in layers such as [`TimeoutLayer`](crate::middleware::TimeoutLayer)
    /// are used this way.
    pub fn from_layer<L>(layer: L) -> Self
    where
        L: Layer<SharedExecutor> + Send + Sync + 'static,
        L::Service: Executor + 'static,
    {
        Self::new(move |next| Arc::new(layer.layer(next)))
    }

    /// Middleware from any tower [`Layer`] over [`Service<Request>`].
    ///
    /// The next executor is seen by the layer as an [`ExecutorService`]. Each
    /// call drives a clone of the layered service through readiness, so
    /// layers relying on `poll_ready` (concurrency limit, ...) work as usual.
    ///
    /// ```
    /// use tether::Middleware;
    /// use tower::limit::ConcurrencyLimitLayer;
    ///
    /// let limit = Middleware::from_tower(ConcurrencyLimitLayer::new(4));
    /// assert!(!limit.is_absent());
    /// ```
    pub fn from_tower<L>(layer: L) -> Self
    where
        L: Layer<ExecutorService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self::new(move |next| {
            let service = layer.layer(ExecutorService::new(next));
            Arc::new(TowerExecutor::new(BoxCloneService::new(service)))
        })
    }
}

impl From<Option<Self>> for Middleware {
    fn from(middleware: Option<Self>) -> Self {
        middleware.unwrap_or_default()
    }
}

/// Nest `middlewares` around `base`.
///
/// The list is traversed in reverse so that `middlewares[0]` ends up
/// outermost. An empty list (or a list of absent middlewares) returns `base`
/// itself.
#[must_use]
pub fn compose(base: SharedExecutor, middlewares: &[Middleware]) -> SharedExecutor {
    middlewares
        .iter()
        .rev()
        .filter(|middleware| !middleware.is_absent())
        .fold(base, |next, middleware| middleware.wrap(next))
}

// ============================================================================
// Tower bridges
// ============================================================================

/// An [`Executor`] seen as a tower [`Service`].
///
/// Always ready; readiness is the concern of the layers stacked on top.
#[derive(Clone)]
pub struct ExecutorService {
    inner: SharedExecutor,
}

impl ExecutorService {
    /// Wrap a shared executor.
    #[must_use]
    pub const fn new(inner: SharedExecutor) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for ExecutorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorService").finish_non_exhaustive()
    }
}

impl Service<Request> for ExecutorService {
    type Response = Response;
    type Error = Error;
    type Future = ResponseFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.inner.execute(request)
    }
}

type BoxedService = BoxCloneService<Request, Response, Error>;

/// A tower service seen as an [`Executor`].
///
/// The mutex makes the service `Sync`; it is only held to clone the service.
struct TowerExecutor {
    inner: Mutex<BoxedService>,
}

impl TowerExecutor {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Mutex::new(service),
        }
    }
}

impl Executor for TowerExecutor {
    fn execute(&self, request: Request) -> ResponseFuture {
        let service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(service.oneshot(request))
    }
}
