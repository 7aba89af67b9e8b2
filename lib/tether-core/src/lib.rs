//! Core types and traits for the tether middleware chain.
//!
//! This crate provides the foundational types used by tether:
//! - [`Executor`] and [`Transport`] - the two request execution capabilities
//! - [`ExecutorFn`] - closure adapter implementing both capabilities
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - outgoing request
//! - [`Response`] and [`Body`] - response with a possibly streaming body
//! - [`Context`] - deadline and cancellation scope attached to a request
//! - [`Error`], [`ErrorKind`] and [`Result`] - error handling
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod body;
mod context;
mod error;
mod executor;
mod method;
pub mod prelude;
mod request;
mod response;

pub use body::{Body, BodyStream, ContentType, from_json, to_form, to_json};
pub use context::{CancelHandle, Context};
pub use error::{Error, ErrorKind, PanicError, Result};
pub use executor::{
    Executor, ExecutorFn, ExecutorTransport, ResponseFuture, SharedExecutor, SharedTransport,
    Transport, TransportExecutor,
};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, StatusCode, header};
