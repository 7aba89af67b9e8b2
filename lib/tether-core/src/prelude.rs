//! Prelude module for convenient imports.
//!
//! ```ignore
//! use tether_core::prelude::*;
//! ```

pub use crate::{
    Body, Context, Error, ErrorKind, Executor, ExecutorFn, Method, Request, RequestBuilder,
    Response, Result, SharedExecutor, SharedTransport, Transport,
};
