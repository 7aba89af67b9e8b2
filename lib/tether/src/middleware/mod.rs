//! Built-in middlewares.
//!
//! Each middleware comes as a constructor function returning a [`Middleware`]
//! ready for [`Client::new`](crate::Client::new) or
//! [`LayeredTransport::new`](crate::LayeredTransport::new), backed by a tower
//! [`Layer`] producing an [`Executor`](crate::Executor) for power users.
//!
//! Constructors whose configuration is vacuous return
//! [`Middleware::absent`]:
//!
//! | Constructor | Absent when |
//! |-------------|-------------|
//! | [`timeout`] | duration is zero |
//! | [`set_header`] and its helpers | header name is empty |
//! | [`bearer_auth`] | token is empty |
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tether::{Client, HttpClient, middleware};
//!
//! let client = Client::new(
//!     HttpClient::new(),
//!     [
//!         middleware::recover(),
//!         middleware::logging(),
//!         middleware::strip_slashes(true),
//!         middleware::timeout(Duration::from_secs(30)),
//!         middleware::user_agent("tether/0.1"),
//!         middleware::accept("application/json"),
//!     ],
//! );
//! # drop(client);
//! ```

use std::time::Duration;

use crate::chain::Middleware;

mod basic_auth;
mod header;
mod logging;
mod recover;
mod secure;
mod strip_slashes;
mod timeout;

pub use basic_auth::{BasicAuth, BasicAuthLayer, basic_auth};
pub use header::{
    SetHeader, SetHeaderLayer, accept, authorization, bearer_auth, content_type, set_header,
    user_agent,
};
pub use logging::{LogLevel, Logging, LoggingLayer};
pub use recover::{Recover, RecoverLayer};
pub use secure::{Secure, SecureLayer};
pub use strip_slashes::{StripSlashes, StripSlashesLayer};
pub use timeout::{Timeout, TimeoutLayer};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};

// Re-export tower middleware layers, usable through `Middleware::from_tower`
pub use tower::limit::ConcurrencyLimitLayer;

/// Turn panics of the rest of the chain into [`Error::Panic`](crate::Error::Panic).
///
/// Install it first so it covers every other middleware.
#[must_use]
pub fn recover() -> Middleware {
    Middleware::from_layer(RecoverLayer)
}

/// Collapse repeated `/` in the request path, and with `strip_trailing` remove
/// a trailing `/` (except for the root path).
#[must_use]
pub fn strip_slashes(strip_trailing: bool) -> Middleware {
    Middleware::from_layer(StripSlashesLayer::new(strip_trailing))
}

/// Fail requests to non-`https` URLs with
/// [`Error::InsecureScheme`](crate::Error::InsecureScheme).
///
/// Most useful on a [`LayeredTransport`](crate::LayeredTransport), where
/// redirect targets are checked too.
#[must_use]
pub fn secure() -> Middleware {
    Middleware::from_layer(SecureLayer)
}

/// Attach a deadline `duration` from now to each request, absent for a zero
/// duration.
///
/// The deadline also bounds reads of the response body.
#[must_use]
pub fn timeout(duration: Duration) -> Middleware {
    if duration.is_zero() {
        return Middleware::absent();
    }

    Middleware::from_layer(TimeoutLayer::new(duration))
}

/// Log requests and responses with `tracing` at info level.
#[must_use]
pub fn logging() -> Middleware {
    Middleware::from_layer(LoggingLayer::new())
}
