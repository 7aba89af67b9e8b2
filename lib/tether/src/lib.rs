//! Composable middleware chains for outgoing HTTP requests.
//!
//! A [`Middleware`] wraps an [`Executor`] into another executor. A [`Client`]
//! (or a [`LayeredTransport`]) composes a list of middlewares around a base
//! once, at construction, and derives new wrappers with [`Client::with`]
//! without ever changing the parent.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tether::prelude::*;
//!
//! let client = Client::new(
//!     HttpClient::new(),
//!     [
//!         middleware::recover(),
//!         middleware::timeout(Duration::from_secs(10)),
//!         middleware::accept("application/json"),
//!     ],
//! );
//! let admin = client.with([middleware::bearer_auth("s3cr3t")]);
//!
//! let request = Request::builder(Method::Get, "https://api.example.com/users".parse()?).build()?;
//! let users: Vec<User> = admin.execute(request).await?.json().await?;
//! ```
//!
//! Middlewares run in list order on the way in and in reverse order on the
//! way out; absent middlewares (see [`Middleware::absent`]) are skipped.

mod chain;
mod client;
mod config;
#[cfg(feature = "hyper-transport")]
mod connector;
#[cfg(feature = "fixtures")]
pub mod fixture;
mod http_client;
#[cfg(feature = "hyper-transport")]
mod hyper_transport;
pub mod middleware;
pub mod prelude;
mod transport;

pub use chain::{ExecutorService, Middleware, compose};
pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_MAX_REDIRECTS};
pub use http_client::{HttpClient, HttpClientBuilder};
#[cfg(feature = "hyper-transport")]
pub use hyper_transport::HyperTransport;
pub use transport::LayeredTransport;

// Re-export tower for layer composition
pub use tower;

// Re-export core types
pub use tether_core::{
    Body, BodyStream, CancelHandle, ContentType, Context, Error, ErrorKind, Executor, ExecutorFn,
    ExecutorTransport, Method, PanicError, Request, RequestBuilder, Response, ResponseFuture,
    Result, SharedExecutor, SharedTransport, Transport, TransportExecutor, from_json, to_form,
    to_json,
};

// Re-export http types for status codes and headers
pub use tether_core::{HeaderMap, StatusCode, header};

// Re-export crates used in public signatures
pub use http;
pub use url;
