//! Request deadline middleware.
//!
//! The wrapped executor receives the request attached to a child [`Context`]
//! expiring after the configured duration. Nothing is raced here: the base
//! executor observes the deadline, and so does every later read of a body
//! bound to that context.

use std::time::Duration;

use tower::Layer;
use tracing::trace;

use crate::{Context, Executor, Request, ResponseFuture, SharedExecutor};

/// Layer attaching a deadline to each request.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    duration: Duration,
}

impl TimeoutLayer {
    /// Create a new layer.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Layer<SharedExecutor> for TimeoutLayer {
    type Service = Timeout;

    fn layer(&self, inner: SharedExecutor) -> Self::Service {
        Timeout {
            inner,
            duration: self.duration,
        }
    }
}

/// Executor deriving a deadline-bound context for each request.
#[derive(Clone)]
pub struct Timeout {
    inner: SharedExecutor,
    duration: Duration,
}

impl Executor for Timeout {
    fn execute(&self, mut request: Request) -> ResponseFuture {
        let context: Context = request.context().with_timeout(self.duration);
        trace!(timeout = ?self.duration, "deadline attached");
        request.set_context(context);

        self.inner.execute(request)
    }
}
