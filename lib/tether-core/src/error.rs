//! Error types for tether.
//!
//! Every failure in a middleware chain is a single [`Error`]. Sentinel conditions
//! (recovered panic, insecure scheme, expired deadline) are matched through
//! [`Error::kind`] rather than through the rendered message:
//!
//! ```
//! use tether_core::{Error, ErrorKind};
//!
//! let err = Error::InsecureScheme;
//! assert!(err.is(ErrorKind::InsecureScheme));
//! assert!(!err.is(ErrorKind::PanicRecovered));
//! ```

use std::any::Any;
use std::backtrace::Backtrace;

use derive_more::{Display, Error, From};

// ============================================================================
// Error Kind
// ============================================================================

/// Identity tag of an [`Error`].
///
/// Kinds are plain constants, so comparing them never depends on formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// Transport-level failure reported by the base executor.
    #[display("transport")]
    Transport,
    /// A panic raised inside the chain was recovered.
    #[display("panic recovered")]
    PanicRecovered,
    /// The request URL scheme was not `https`.
    #[display("insecure scheme")]
    InsecureScheme,
    /// The request context deadline elapsed.
    #[display("deadline exceeded")]
    DeadlineExceeded,
    /// The request context was cancelled.
    #[display("context cancelled")]
    Cancelled,
    /// The request could not be built or sent as described.
    #[display("invalid request")]
    InvalidRequest,
    /// The response could not be read or parsed.
    #[display("invalid response")]
    InvalidResponse,
    /// Body (de)serialization failed.
    #[display("serialization")]
    Serialization,
    /// Redirect handling failed.
    #[display("redirect")]
    Redirect,
    /// Filesystem access failed.
    #[display("io")]
    Io,
}

// ============================================================================
// Panic Error
// ============================================================================

/// A panic recovered by the recover middleware.
///
/// Carries the panic payload rendered as text and the stack trace captured at
/// the point of panic recovery.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("panic recovered: {recovered}")]
pub struct PanicError {
    /// The recovered panic value.
    pub recovered: String,
    /// The stack trace at the point of panic recovery.
    pub stack: String,
}

impl PanicError {
    /// Build a panic error from a payload returned by `catch_unwind`.
    ///
    /// `&str` and `String` payloads are kept verbatim; any other payload type is
    /// reported as `Box<dyn Any>`.
    #[must_use]
    pub fn from_payload(payload: &(dyn Any + Send), stack: &Backtrace) -> Self {
        let recovered = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());

        Self {
            recovered,
            stack: stack.to_string(),
        }
    }

    /// Always [`ErrorKind::PanicRecovered`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::PanicRecovered
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for tether operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// Malformed or unreadable response.
    #[display("invalid response: {_0}")]
    #[from(skip)]
    InvalidResponse(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    Json(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    Form(serde_urlencoded::ser::Error),

    /// Filesystem error.
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),

    /// The request context deadline elapsed.
    #[display("context deadline exceeded")]
    #[from(skip)]
    DeadlineExceeded,

    /// The request context was cancelled.
    #[display("context canceled")]
    #[from(skip)]
    Cancelled,

    /// The request URL scheme was not `https`.
    #[display("insecure scheme")]
    #[from(skip)]
    InsecureScheme,

    /// A panic was recovered inside the chain.
    #[display("{_0}")]
    #[from]
    Panic(PanicError),

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The identity tag of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) | Self::Tls(_) => ErrorKind::Transport,
            Self::InvalidRequest(_) | Self::InvalidUrl(_) => ErrorKind::InvalidRequest,
            Self::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Self::Json(_) | Self::JsonDeserialization { .. } | Self::Form(_) => {
                ErrorKind::Serialization
            }
            Self::Io(_) => ErrorKind::Io,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InsecureScheme => ErrorKind::InsecureScheme,
            Self::Panic(_) => ErrorKind::PanicRecovered,
            Self::TooManyRedirects { .. } | Self::InvalidRedirect(_) => ErrorKind::Redirect,
        }
    }

    /// Returns `true` if this error has the given kind.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// Returns `true` if a panic was recovered.
    #[must_use]
    pub const fn is_panic_recovered(&self) -> bool {
        matches!(self, Self::Panic(_))
    }

    /// Returns `true` if the request was rejected for its scheme.
    #[must_use]
    pub const fn is_insecure_scheme(&self) -> bool {
        matches!(self, Self::InsecureScheme)
    }

    /// Returns `true` if the request context deadline elapsed.
    #[must_use]
    pub const fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    /// Alias of [`Error::is_deadline_exceeded`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        self.is_deadline_exceeded()
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// The recovered panic, if any.
    #[must_use]
    pub const fn panic(&self) -> Option<&PanicError> {
        match self {
            Self::Panic(panic) => Some(panic),
            _ => None,
        }
    }
}
