//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob
//! importing:
//!
//! ```ignore
//! use tether::prelude::*;
//! ```

pub use crate::{
    Client, ClientConfig, Context, Error, ErrorKind, Executor, ExecutorFn, HttpClient,
    LayeredTransport, Method, Middleware, Request, RequestBuilder, Response, Result, StatusCode,
    Transport, header, middleware,
};

#[cfg(feature = "hyper-transport")]
pub use crate::HyperTransport;
