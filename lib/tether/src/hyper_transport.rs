//! Network transport using hyper-util.

use std::fmt;

use bytes::Bytes;
use futures_util::{TryStreamExt, future};
use http_body_util::{BodyStream, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tracing::trace;

use crate::{
    Body, ClientConfig, Context, Error, Request, Response, ResponseFuture, Result, Transport,
    connector::https_connector,
};

/// [`Transport`] sending requests over the network, with connection pooling
/// and TLS.
///
/// The request [`Context`] bounds the wait for the response head, and the
/// returned streaming body stays bound to it: a deadline elapsing while the
/// body is read fails the read.
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    /// Transport with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&ClientConfig::default())
    }

    /// Transport using the connection and pool settings of `config`.
    #[must_use]
    pub fn with_config(config: &ClientConfig) -> Self {
        let connector = https_connector(config.connect_timeout);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { inner }
    }

    /// Build a hyper request, keeping the context aside.
    fn build_hyper_request(request: Request) -> Result<(http::Request<Full<Bytes>>, Context)> {
        let (method, url, headers, body, context) = request.into_parts();

        let body = body.map_or_else(Full::default, Full::new);
        let mut http_request = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str())
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *http_request.headers_mut() = headers;

        Ok((http_request, context))
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let (hyper_request, context) = Self::build_hyper_request(request)?;
        trace!(uri = %hyper_request.uri(), "round trip");

        let response = context
            .run(async {
                self.inner
                    .request(hyper_request)
                    .await
                    .map_err(Self::map_hyper_error)
            })
            .await?;

        let (parts, body) = response.into_parts();
        let chunks = BodyStream::new(body)
            .map_err(|e| Error::connection(e.to_string()))
            .try_filter_map(|frame| future::ready(Ok(frame.into_data().ok())));

        Ok(Response::new(
            parts.status.as_u16(),
            parts.headers,
            Body::from_stream(chunks).with_context(context),
        ))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Transport for HyperTransport {
    fn round_trip(&self, request: Request) -> ResponseFuture {
        let transport = self.clone();
        Box::pin(async move { transport.send(request).await })
    }
}
