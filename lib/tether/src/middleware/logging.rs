//! Request logging middleware.
//!
//! Each request runs inside an `http_request` span carrying the method, the
//! URL without query or fragment and the time left before the context
//! deadline, if any.

use tokio::time::Instant;
use tower::Layer;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{Error, Executor, Request, Response, ResponseFuture, SharedExecutor};

/// Layer logging requests and their outcome.
///
/// # Example
///
/// ```ignore
/// use tether::{Client, Middleware};
/// use tether::middleware::LoggingLayer;
///
/// let client = Client::new(base, [Middleware::from_layer(LoggingLayer::debug())]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// Verbosity of [`LoggingLayer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Also log request and response headers.
    Debug,
    /// Method, URL, status and elapsed time only.
    #[default]
    Info,
}

impl LoggingLayer {
    /// Info level logging.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Debug level logging, with headers.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// The configured verbosity.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Layer<SharedExecutor> for LoggingLayer {
    type Service = Logging;

    fn layer(&self, inner: SharedExecutor) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Executor logging around the rest of the chain.
#[derive(Clone)]
pub struct Logging {
    inner: SharedExecutor,
    level: LogLevel,
}

impl Executor for Logging {
    fn execute(&self, request: Request) -> ResponseFuture {
        let deadline_ms = request
            .context()
            .remaining()
            .map(|left| u64::try_from(left.as_millis()).unwrap_or(u64::MAX));
        let span = info_span!(
            "http_request",
            method = %request.method(),
            url = %loggable_url(request.url()),
            deadline_ms,
        );

        if self.level == LogLevel::Debug {
            // sensitive values print as `Sensitive`
            debug!(parent: &span, headers = ?request.headers(), "sending request");
        } else {
            info!(parent: &span, "sending request");
        }

        let inner = self.inner.clone();
        let level = self.level;
        Box::pin(
            async move {
                let start = Instant::now();
                let result = inner.execute(request).await;
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => log_response(response, level, elapsed_ms),
                    Err(err) => log_failure(err, elapsed_ms),
                }
                result
            }
            .instrument(span),
        )
    }
}

/// Origin and path only; query strings may carry tokens.
fn loggable_url(url: &url::Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

fn log_response(response: &Response, level: LogLevel, elapsed_ms: u64) {
    let status = response.status();
    if level == LogLevel::Debug {
        debug!(status, headers = ?response.headers(), "response headers");
    }

    if response.is_success() || (300..400).contains(&status) {
        info!(status, elapsed_ms, "request completed");
    } else {
        warn!(status, elapsed_ms, "request completed with HTTP error");
    }
}

fn log_failure(err: &Error, elapsed_ms: u64) {
    if err.is_panic_recovered() {
        error!(error = %err, elapsed_ms, "request panicked");
    } else {
        warn!(error = %err, kind = %err.kind(), elapsed_ms, "request failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use assert2::{check, let_assert};

    use super::*;
    use crate::{Context, ExecutorFn, Method};

    fn request(url: &str) -> Request {
        let_assert!(Ok(url) = url.parse::<url::Url>());
        Request::new(Method::Get, url)
    }

    #[test]
    fn levels() {
        check!(LoggingLayer::new().level() == LogLevel::Info);
        check!(LoggingLayer::debug().level() == LogLevel::Debug);
    }

    #[test]
    fn logged_url_has_no_query() {
        let_assert!(Ok(url) = "https://api.example.com:8443/v1/users?token=s3cr3t#top".parse::<url::Url>());
        check!(loggable_url(&url) == "https://api.example.com:8443/v1/users");

        let_assert!(Ok(url) = "http://example.com/?api_key=abc".parse::<url::Url>());
        check!(loggable_url(&url) == "http://example.com/");
    }

    #[tokio::test]
    async fn logging_is_transparent() {
        let base = ExecutorFn::new(|_request: Request| async {
            Ok::<_, Error>(Response::with_status(404))
        });
        let logging = LoggingLayer::debug().layer(Arc::new(base));

        let_assert!(Ok(response) = logging.execute(request("https://example.com/missing")).await);
        check!(response.status() == 404);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_pass_through_with_their_context() {
        let base = ExecutorFn::new(|request: Request| async move {
            check!(request.context().remaining().is_some());
            Err::<Response, _>(Error::DeadlineExceeded)
        });
        let logging = LoggingLayer::new().layer(Arc::new(base));

        let context = Context::background().with_timeout(Duration::from_secs(3));
        let request = request("https://example.com/").with_context(context);
        let_assert!(Err(err) = logging.execute(request).await);
        check!(err.is_deadline_exceeded());
    }
}
