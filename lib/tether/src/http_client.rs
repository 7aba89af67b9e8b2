//! Generic HTTP client hosting a [`Transport`] and following redirects.

use std::fmt;
use std::sync::Arc;

use http::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION, PROXY_AUTHORIZATION,
};
use tracing::debug;
use url::Url;

use crate::chain::Middleware;
use crate::config::{ClientConfig, ClientConfigBuilder};
use crate::transport::LayeredTransport;
use crate::{Error, Executor, Method, Request, ResponseFuture, Result, SharedTransport, Transport};

/// HTTP client over a [`Transport`].
///
/// Redirects (301, 302, 303, 307, 308) are followed hop by hop, each hop being
/// a separate [`Transport::round_trip`]. Middlewares installed on the
/// transport therefore see every redirect target, while the client itself
/// only decides where to go next.
///
/// Credentials (`Authorization`, `Proxy-Authorization`, `Cookie`) only follow
/// a redirect to the original host or one of its subdomains.
///
/// # Example
///
/// ```ignore
/// use tether::{HttpClient, middleware};
///
/// let client = HttpClient::builder()
///     .max_redirects(3)
///     .with(middleware::secure())
///     .build();
/// ```
#[derive(Clone)]
pub struct HttpClient {
    transport: SharedTransport,
    config: ClientConfig,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "hyper-transport")]
impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Client over a [`HyperTransport`](crate::HyperTransport) with the
    /// default configuration.
    #[cfg(feature = "hyper-transport")]
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Client over `transport` with the default configuration.
    pub fn with_transport<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self::builder().transport(transport).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The transport used for every hop.
    #[must_use]
    pub const fn transport(&self) -> &SharedTransport {
        &self.transport
    }
}

impl Executor for HttpClient {
    fn execute(&self, request: Request) -> ResponseFuture {
        let transport = Arc::clone(&self.transport);
        let max_redirects = self.config.max_redirects;

        Box::pin(async move {
            let origin = request.url().host_str().map(str::to_ascii_lowercase);
            let mut current = request;
            let mut redirects = 0;

            loop {
                if let Some(err) = current.context().err() {
                    return Err(err);
                }

                let response = transport.round_trip(current.clone()).await?;

                if !is_redirect(response.status()) || max_redirects == 0 {
                    return Ok(response);
                }

                if redirects >= max_redirects {
                    return Err(Error::TooManyRedirects {
                        count: redirects,
                        max: max_redirects,
                    });
                }

                let location = response.header(LOCATION.as_str()).ok_or_else(|| {
                    Error::InvalidRedirect("redirect response missing Location header".into())
                })?;
                let url = resolve_redirect_url(current.url(), location)?;
                let method = redirect_method(response.status(), current.method());
                debug!(status = response.status(), location = %url, "following redirect");

                let keep_credentials = is_same_site(origin.as_deref(), &url);
                current = redirected(current, method, url, keep_credentials);
                redirects += 1;
            }
        })
    }
}

/// Check if a status code is a redirect.
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Determine the method for the redirected request.
///
/// - 301, 302, 303: GET and HEAD are kept, other methods become GET
/// - 307, 308: Preserve original method
fn redirect_method(status: u16, original: Method) -> Method {
    match (status, original) {
        (307 | 308, method) | (_, method @ (Method::Get | Method::Head)) => method,
        _ => Method::Get,
    }
}

/// Whether `target` is on the `origin` host or one of its subdomains.
fn is_same_site(origin: Option<&str>, target: &Url) -> bool {
    let (Some(origin), Some(host)) = (origin, target.host_str()) else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    host == origin
        || host
            .strip_suffix(origin)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Resolve a redirect Location URL relative to the current request URL.
fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(location) {
        return Ok(url);
    }

    base_url.join(location).map_err(Error::InvalidUrl)
}

/// The next hop: same headers and context, body dropped when the method
/// was rewritten to GET, credentials dropped when leaving the origin site.
fn redirected(request: Request, method: Method, url: Url, keep_credentials: bool) -> Request {
    let keep_body = method == request.method();
    let (_, _, mut headers, body, context) = request.into_parts();

    if !keep_credentials {
        for name in [AUTHORIZATION, PROXY_AUTHORIZATION, COOKIE] {
            headers.remove(name);
        }
    }

    let body = if keep_body {
        body
    } else {
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        None
    };

    Request::from_parts(method, url, headers, body, context)
}

/// Builder for [`HttpClient`].
///
/// Middlewares added with [`HttpClientBuilder::with`] are installed on the
/// transport, so they run once per hop.
#[derive(Default)]
pub struct HttpClientBuilder {
    config: ClientConfigBuilder,
    transport: Option<SharedTransport>,
    middlewares: Vec<Middleware>,
}

impl fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl HttpClientBuilder {
    /// Set the connection timeout of the default transport.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host of the default transport.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout of the default transport.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Set the maximum number of redirects; `0` returns redirect responses
    /// as they are.
    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config = self.config.max_redirects(max);
        self
    }

    /// Use `transport` instead of the default network transport.
    #[must_use]
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Install a middleware on the transport.
    ///
    /// Middlewares run in the order they are added.
    #[must_use]
    pub fn with(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> HttpClient {
        let config = self.config.build();
        let base = self
            .transport
            .unwrap_or_else(|| default_transport(&config));

        let transport: SharedTransport = if self.middlewares.is_empty() {
            base
        } else {
            Arc::new(LayeredTransport::from_shared(base, self.middlewares))
        };

        HttpClient { transport, config }
    }
}

#[cfg(feature = "hyper-transport")]
fn default_transport(config: &ClientConfig) -> SharedTransport {
    Arc::new(crate::HyperTransport::with_config(config))
}

#[cfg(not(feature = "hyper-transport"))]
fn default_transport(_config: &ClientConfig) -> SharedTransport {
    Arc::new(crate::ExecutorFn::new(|_request: Request| async {
        Err::<crate::Response, _>(Error::connection(
            "no transport configured (enable the `hyper-transport` feature)",
        ))
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert2::{check, let_assert};
    use bytes::Bytes;
    use http::HeaderMap;

    use super::*;
    use crate::{ExecutorFn, Response};

    fn redirect_to(status: u16, location: &str) -> Response {
        let mut headers = HeaderMap::new();
        if let Ok(value) = location.parse() {
            headers.insert(LOCATION, value);
        }
        Response::new(status, headers, "")
    }

    /// Transport answering with a redirect for `/old` and recording every hop.
    fn hops_transport(status: u16, hops: &Arc<Mutex<Vec<String>>>) -> impl Transport + 'static {
        let hops = Arc::clone(hops);
        ExecutorFn::new(move |request: Request| {
            let hop = format!(
                "{} {} body={}",
                request.method(),
                request.url().path(),
                request.body().map_or(0, Bytes::len)
            );
            if let Ok(mut hops) = hops.lock() {
                hops.push(hop);
            }
            let response = if request.url().path() == "/old" {
                redirect_to(status, "/new")
            } else {
                Response::with_status(200)
            };
            async move { Ok::<_, Error>(response) }
        })
    }

    fn post(url: &str) -> Request {
        let_assert!(Ok(url) = Url::parse(url));
        let_assert!(
            Ok(request) = Request::builder(Method::Post, url)
                .header("content-type", "text/plain")
                .body("payload")
                .build()
        );
        request
    }

    fn recorded(hops: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        hops.lock().map(|hops| hops.clone()).unwrap_or_default()
    }

    #[test]
    fn is_redirect_true() {
        assert!(is_redirect(301));
        assert!(is_redirect(302));
        assert!(is_redirect(303));
        assert!(is_redirect(307));
        assert!(is_redirect(308));
    }

    #[test]
    fn is_redirect_false() {
        assert!(!is_redirect(200));
        assert!(!is_redirect(404));
        assert!(!is_redirect(300)); // 300 Multiple Choices is not auto-followed
        assert!(!is_redirect(304)); // 304 Not Modified is not a redirect
    }

    #[test]
    fn redirect_method_rules() {
        check!(redirect_method(301, Method::Post) == Method::Get);
        check!(redirect_method(303, Method::Delete) == Method::Get);
        check!(redirect_method(307, Method::Post) == Method::Post);
        check!(redirect_method(308, Method::Put) == Method::Put);
        check!(redirect_method(301, Method::Head) == Method::Head);
        check!(redirect_method(302, Method::Head) == Method::Head);
        check!(redirect_method(303, Method::Get) == Method::Get);
    }

    #[test]
    fn same_site_rules() {
        let_assert!(Ok(same) = Url::parse("https://API.good.test:8443/x"));
        let_assert!(Ok(sub) = Url::parse("https://eu.api.good.test/x"));
        let_assert!(Ok(parent) = Url::parse("https://good.test/x"));
        let_assert!(Ok(lookalike) = Url::parse("https://evilapi.good.test/x"));
        let_assert!(Ok(other) = Url::parse("https://evil.test/x"));

        check!(is_same_site(Some("api.good.test"), &same));
        check!(is_same_site(Some("api.good.test"), &sub));
        check!(!is_same_site(Some("api.good.test"), &parent));
        check!(!is_same_site(Some("api.good.test"), &lookalike));
        check!(!is_same_site(Some("api.good.test"), &other));
        check!(!is_same_site(None, &other));
    }

    /// Transport redirecting `api.good.test` to `target`, recording the
    /// host and `Authorization`/`Cookie` headers of every hop.
    fn cross_host_transport(
        target: &'static str,
        hops: &Arc<Mutex<Vec<String>>>,
    ) -> impl Transport + 'static {
        let hops = Arc::clone(hops);
        ExecutorFn::new(move |request: Request| {
            let hop = format!(
                "{} auth={} cookie={}",
                request.url().host_str().unwrap_or_default(),
                request.header("authorization").unwrap_or("-"),
                request.header("cookie").unwrap_or("-"),
            );
            if let Ok(mut hops) = hops.lock() {
                hops.push(hop);
            }
            let response = if request.url().host_str() == Some("api.good.test") {
                redirect_to(302, target)
            } else {
                Response::with_status(200)
            };
            async move { Ok::<_, Error>(response) }
        })
    }

    fn authenticated_get() -> Request {
        let_assert!(Ok(url) = Url::parse("https://api.good.test/start"));
        let_assert!(
            Ok(request) = Request::builder(Method::Get, url)
                .header("authorization", "Bearer s3cr3t")
                .header("cookie", "session=1")
                .build()
        );
        request
    }

    #[tokio::test]
    async fn credentials_are_dropped_on_cross_host_redirect() {
        let hops = Arc::default();
        let client = HttpClient::with_transport(cross_host_transport("https://evil.test/steal", &hops));

        let_assert!(Ok(_) = client.execute(authenticated_get()).await);
        check!(
            recorded(&hops)
                == [
                    "api.good.test auth=Bearer s3cr3t cookie=session=1",
                    "evil.test auth=- cookie=-",
                ]
        );
    }

    #[tokio::test]
    async fn credentials_follow_subdomain_redirect() {
        let hops = Arc::default();
        let client =
            HttpClient::with_transport(cross_host_transport("https://eu.api.good.test/next", &hops));

        let_assert!(Ok(_) = client.execute(authenticated_get()).await);
        check!(
            recorded(&hops)
                == [
                    "api.good.test auth=Bearer s3cr3t cookie=session=1",
                    "eu.api.good.test auth=Bearer s3cr3t cookie=session=1",
                ]
        );
    }

    #[tokio::test]
    async fn head_stays_head_on_found() {
        let hops = Arc::default();
        let client = HttpClient::with_transport(hops_transport(302, &hops));

        let_assert!(Ok(url) = Url::parse("https://example.com/old"));
        let_assert!(Ok(_) = client.execute(Request::new(Method::Head, url)).await);
        check!(recorded(&hops) == ["HEAD /old body=0", "HEAD /new body=0"]);
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let_assert!(Ok(base) = Url::parse("https://example.com/old/path"));
        let_assert!(Ok(url) = resolve_redirect_url(&base, "https://other.com/new"));
        check!(url.as_str() == "https://other.com/new");
        let_assert!(Ok(url) = resolve_redirect_url(&base, "/new/path"));
        check!(url.as_str() == "https://example.com/new/path");
        let_assert!(Ok(url) = resolve_redirect_url(&base, "sibling"));
        check!(url.as_str() == "https://example.com/old/sibling");
    }

    #[tokio::test]
    async fn see_other_rewrites_to_get_without_body() {
        let hops = Arc::default();
        let client = HttpClient::with_transport(hops_transport(303, &hops));

        let_assert!(Ok(response) = client.execute(post("https://example.com/old")).await);
        check!(response.status() == 200);
        check!(recorded(&hops) == ["POST /old body=7", "GET /new body=0"]);
    }

    #[tokio::test]
    async fn temporary_redirect_preserves_method_and_body() {
        let hops = Arc::default();
        let client = HttpClient::with_transport(hops_transport(307, &hops));

        let_assert!(Ok(_) = client.execute(post("https://example.com/old")).await);
        check!(recorded(&hops) == ["POST /old body=7", "POST /new body=7"]);
    }

    #[tokio::test]
    async fn redirect_loop_is_bounded() {
        let looping = ExecutorFn::new(|_request: Request| async {
            Ok::<_, Error>(redirect_to(302, "/again"))
        });
        let client = HttpClient::builder()
            .transport(looping)
            .max_redirects(3)
            .build();

        let_assert!(Err(err) = client.execute(post("https://example.com/old")).await);
        let_assert!(Error::TooManyRedirects { count: 3, max: 3 } = err);
    }

    #[tokio::test]
    async fn zero_max_redirects_returns_redirect() {
        let hops = Arc::default();
        let client = HttpClient::builder()
            .transport(hops_transport(301, &hops))
            .max_redirects(0)
            .build();

        let_assert!(Ok(response) = client.execute(post("https://example.com/old")).await);
        check!(response.status() == 301);
        check!(recorded(&hops).len() == 1);
    }

    #[tokio::test]
    async fn missing_location_is_invalid_redirect() {
        let transport = ExecutorFn::new(|_request: Request| async {
            Ok::<_, Error>(Response::with_status(302))
        });
        let client = HttpClient::with_transport(transport);

        let_assert!(Err(Error::InvalidRedirect(_)) = client.execute(post("https://example.com/old")).await);
    }

    #[tokio::test]
    async fn builder_middlewares_run_on_every_hop() {
        let hops = Arc::default();
        let client = HttpClient::builder()
            .transport(hops_transport(302, &hops))
            .with(crate::middleware::secure())
            .build();

        let_assert!(Ok(_) = client.execute(post("https://example.com/old")).await);
        check!(recorded(&hops).len() == 2);

        let_assert!(Err(err) = client.execute(post("http://example.com/old")).await);
        check!(err.is_insecure_scheme());
        check!(recorded(&hops).len() == 2);
    }
}
