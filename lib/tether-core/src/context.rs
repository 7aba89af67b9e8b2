//! Cancellable request scope.
//!
//! A [`Context`] travels with every [`Request`](crate::Request). Deriving a child
//! scope never extends the parent: a child deadline is clamped to the parent's,
//! and a cancelled parent cancels every child.
//!
//! Executors observe the scope cooperatively through [`Context::run`], which
//! races a future against the deadline and the cancel signals.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! use std::time::Duration;
//! use tether_core::{Context, Error};
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(1));
//! let result: Result<(), Error> = ctx
//!     .run(async {
//!         tokio::time::sleep(Duration::from_secs(5)).await;
//!         Ok(())
//!     })
//!     .await;
//! assert!(result.unwrap_err().is_deadline_exceeded());
//! # }
//! ```

use std::future::{Future, pending};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Deadline and cancellation scope of a request.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

/// Cancels the [`Context`] returned alongside it by [`Context::with_cancel`].
///
/// Dropping the handle without calling [`CancelHandle::cancel`] leaves the
/// scope alive.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Cancel the scope and all scopes derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Context {
    /// A scope without deadline that is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child scope expiring after `timeout`, measured from now.
    ///
    /// A timeout too large to be represented as an instant adds no deadline.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    /// Derive a child scope expiring at `deadline`, or at the parent deadline
    /// if that one comes first.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = self
            .deadline
            .map_or(deadline, |parent| parent.min(deadline));

        Self {
            deadline: Some(deadline),
            cancel: self.cancel.clone(),
        }
    }

    /// Derive a child scope that can be cancelled explicitly.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token = self
            .cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);

        let child = Self {
            deadline: self.deadline,
            cancel: Some(token.clone()),
        };
        (child, CancelHandle { token })
    }

    /// The instant this scope expires, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` without deadline.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Why this scope is over, or `None` while it is still alive.
    ///
    /// Cancellation wins over an elapsed deadline.
    #[must_use]
    pub fn err(&self) -> Option<Error> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(Error::Cancelled);
        }

        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the scope is over, with the reason.
    ///
    /// Never resolves for [`Context::background`].
    pub async fn done(&self) -> Error {
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Error::Cancelled,
            () = expired => Error::DeadlineExceeded,
        }
    }

    /// Drive `future` to completion unless the scope ends first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeadlineExceeded`] or [`Error::Cancelled`] when the
    /// scope ends before `future` resolves, otherwise the future's own result.
    pub async fn run<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            result = future => result,
            err = self.done() => Err(err),
        }
    }
}
