//! Panic isolation middleware.
//!
//! A panic raised while the wrapped executor runs, either when it is called
//! or while its future is polled, becomes an [`Error::Panic`] carrying the
//! panic payload and the stack captured at recovery.

use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tower::Layer;
use tracing::error;

use crate::{Error, Executor, PanicError, Request, ResponseFuture, SharedExecutor};

/// Layer that turns panics into [`Error::Panic`].
///
/// # Example
///
/// ```ignore
/// use tether::{Client, Middleware};
/// use tether::middleware::RecoverLayer;
///
/// let client = Client::new(base, [Middleware::from_layer(RecoverLayer)]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoverLayer;

impl Layer<SharedExecutor> for RecoverLayer {
    type Service = Recover;

    fn layer(&self, inner: SharedExecutor) -> Self::Service {
        Recover { inner }
    }
}

/// Executor that recovers from panics of the inner executor.
#[derive(Clone)]
pub struct Recover {
    inner: SharedExecutor,
}

impl Executor for Recover {
    fn execute(&self, request: Request) -> ResponseFuture {
        let inner = self.inner.clone();
        let guarded = AssertUnwindSafe(async move { inner.execute(request).await });

        Box::pin(async move {
            match guarded.catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let stack = Backtrace::force_capture();
                    let panic = PanicError::from_payload(payload.as_ref(), &stack);
                    error!(recovered = %panic.recovered, "panic recovered");
                    Err(Error::Panic(panic))
                }
            }
        })
    }
}
