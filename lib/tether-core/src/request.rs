//! Outgoing HTTP request.
//!
//! Use [`Request::builder`] to construct requests with headers, query parameters,
//! a body and a [`Context`].
//!
//! # Example
//!
//! ```
//! use tether_core::{Method, Request};
//!
//! let request = Request::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::{ContentType, Context, Error, Method, Result};

/// An HTTP request with method, URL, headers, optional body and context.
///
/// Middlewares own the request while it travels down the chain, so each one
/// sees every change made by the middlewares before it.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    context: Context,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Request with no header, no body and a background context.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            context: Context::background(),
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Mutable access to the URL.
    #[must_use]
    pub const fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub const fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Single header value by (case-insensitive) name, if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Mutable access to the body.
    #[must_use]
    pub const fn body_mut(&mut self) -> &mut Option<Bytes> {
        &mut self.body
    }

    /// Context attached to the request.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Replace the attached context.
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    /// The same request attached to `context`.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Consume into (method, url, headers, body, context).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<Bytes>, Context) {
        (self.method, self.url, self.headers, self.body, self.context)
    }

    /// Rebuild a request from its parts.
    #[must_use]
    pub const fn from_parts(
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
        context: Context,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body,
            context,
        }
    }
}

/// Builder for constructing [`Request`] instances.
///
/// Invalid header names or values are reported by [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder {
    request: Request,
    error: Option<Error>,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            request: Request::new(method, url),
            error: None,
        }
    }

    /// Sets a header, replacing any previous value.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.request.headers.insert(name, value);
            }
            (Err(_), _) => {
                self.error = Some(Error::invalid_request(format!("invalid header name: {name:?}")));
            }
            (_, Err(_)) => {
                self.error = Some(Error::invalid_request(format!(
                    "invalid value for header {name}"
                )));
            }
        }
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.request.headers.extend(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.request.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    /// Attach a context.
    #[must_use]
    pub fn context(mut self, context: Context) -> Self {
        self.request.context = context;
        self
    }

    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let body = crate::to_json(value)?;
        Ok(self.content_type(ContentType::Json).body(body))
    }

    /// Set a form-urlencoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn form<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let body = crate::to_form(value)?;
        Ok(self.content_type(ContentType::FormUrlEncoded).body(body))
    }

    fn content_type(mut self, content_type: ContentType) -> Self {
        self.request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        self
    }

    /// Builds the [`Request`].
    ///
    /// # Errors
    ///
    /// Returns the first invalid header encountered.
    pub fn build(self) -> Result<Request> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.request),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert2::{check, let_assert};

    use super::*;

    fn url(s: &str) -> Url {
        let_assert!(Ok(url) = Url::parse(s));
        url
    }

    #[test]
    fn request_builder_basic() {
        let_assert!(
            Ok(request) = Request::builder(Method::Get, url("https://api.example.com/users"))
                .header("Accept", "application/json")
                .build()
        );

        check!(request.method() == Method::Get);
        check!(request.url().as_str() == "https://api.example.com/users");
        check!(request.header("accept") == Some("application/json"));
        check!(request.body().is_none());
        check!(request.context().deadline().is_none());
    }

    #[test]
    fn header_overwrites() {
        let_assert!(
            Ok(request) = Request::builder(Method::Get, url("https://api.example.com"))
                .header("X-Foo", "foo")
                .header("x-foo", "bar")
                .build()
        );

        check!(request.headers().get_all("X-Foo").iter().count() == 1);
        check!(request.header("X-Foo") == Some("bar"));
    }

    #[test]
    fn invalid_header_fails_build() {
        let result = Request::builder(Method::Get, url("https://api.example.com"))
            .header("bad header", "value")
            .build();

        let_assert!(Err(Error::InvalidRequest(message)) = result);
        check!(message.contains("invalid header name"));
    }

    #[test]
    fn request_builder_with_query() {
        let_assert!(
            Ok(request) = Request::builder(Method::Get, url("https://api.example.com/users"))
                .query("page", "1")
                .query("limit", "10")
                .build()
        );

        check!(request.url().as_str() == "https://api.example.com/users?page=1&limit=10");
    }

    #[test]
    fn request_builder_json() {
        #[derive(serde::Serialize)]
        struct User {
            name: String,
        }

        let_assert!(
            Ok(builder) = Request::builder(Method::Post, url("https://api.example.com/users"))
                .json(&User {
                    name: "test".to_string(),
                })
        );
        let_assert!(Ok(request) = builder.build());

        check!(request.header("Content-Type") == Some("application/json"));
        check!(request.body() == Some(&Bytes::from_static(br#"{"name":"test"}"#)));
    }

    #[tokio::test(start_paused = true)]
    async fn request_carries_context() {
        let context = Context::background().with_timeout(Duration::from_secs(1));
        let deadline = context.deadline();

        let_assert!(
            Ok(request) = Request::builder(Method::Get, url("https://api.example.com"))
                .context(context)
                .build()
        );
        check!(request.context().deadline() == deadline);

        let (_, _, _, _, context) = request.into_parts();
        check!(context.deadline() == deadline);
    }
}
