//! Record and replay HTTP exchanges from a directory.
//!
//! A request is dumped as text (request line, `Host`, headers sorted by name,
//! blank line, body). The lowercase hex SHA-256 of that dump names the
//! fixture: `<name>.req.txt` holds the request dump and `<name>.res.txt` the
//! response dump (status line, headers, blank line, body).
//!
//! ```ignore
//! use tether::{Client, HttpClient, fixture};
//!
//! // First run records, later runs replay without touching the network.
//! let live = Client::new(HttpClient::new(), [fixture::record("tests/fixtures")]);
//! let client = Client::new(fixture::try_replay(live, "tests/fixtures"), []);
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use ring::digest;
use tracing::debug;

use crate::chain::Middleware;
use crate::{Error, Executor, ExecutorFn, Request, Response, ResponseFuture, Result, SharedExecutor};

const REQUEST_SUFFIX: &str = ".req.txt";
const RESPONSE_SUFFIX: &str = ".res.txt";

/// Text dump of a request, as used to name fixtures.
#[must_use]
pub fn dump_request(request: &Request) -> Bytes {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut dump = BytesMut::new();
    dump.put_slice(format!("{} {target} HTTP/1.1\r\n", request.method()).as_bytes());

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    dump.put_slice(format!("Host: {host}\r\n").as_bytes());

    put_headers(&mut dump, request.headers());
    dump.put_slice(b"\r\n");
    if let Some(body) = request.body() {
        dump.put_slice(body);
    }
    dump.freeze()
}

/// Text dump of a response with a buffered body.
#[must_use]
pub fn dump_response(status: u16, headers: &HeaderMap, body: &[u8]) -> Bytes {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or_default();

    let mut dump = BytesMut::new();
    dump.put_slice(format!("HTTP/1.1 {status} {reason}\r\n").as_bytes());
    put_headers(&mut dump, headers);
    dump.put_slice(b"\r\n");
    dump.put_slice(body);
    dump.freeze()
}

fn put_headers(dump: &mut BytesMut, headers: &HeaderMap) {
    let mut names: Vec<&HeaderName> = headers.keys().collect();
    names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    for name in names {
        for value in headers.get_all(name) {
            dump.put_slice(name.as_str().as_bytes());
            dump.put_slice(b": ");
            dump.put_slice(value.as_bytes());
            dump.put_slice(b"\r\n");
        }
    }
}

/// Fixture name of a request: hex SHA-256 of its dump.
#[must_use]
pub fn fixture_name(request: &Request) -> String {
    let hash = digest::digest(&digest::SHA256, &dump_request(request));
    hex::encode(hash.as_ref())
}

/// Parse a response dump.
///
/// # Errors
///
/// Returns [`Error::InvalidResponse`] for a malformed status line or header.
pub fn parse_response(data: &[u8]) -> Result<Response> {
    let (head, body) = split_head(data)
        .ok_or_else(|| Error::invalid_response("response dump without header terminator"))?;
    let head = std::str::from_utf8(head)
        .map_err(|e| Error::invalid_response(format!("response dump head: {e}")))?;

    let mut lines = head.lines();
    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| Error::invalid_response(format!("bad status line: {status_line:?}")))?;

    let mut headers = HeaderMap::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::invalid_response(format!("bad header line: {line:?}")))?;
        let name = HeaderName::try_from(name.trim())
            .map_err(|e| Error::invalid_response(e.to_string()))?;
        let value = HeaderValue::try_from(value.trim())
            .map_err(|e| Error::invalid_response(e.to_string()))?;
        headers.append(name, value);
    }

    Ok(Response::new(status, headers, Bytes::copy_from_slice(body)))
}

fn split_head(data: &[u8]) -> Option<(&[u8], &[u8])> {
    [&b"\r\n\r\n"[..], &b"\n\n"[..]]
        .into_iter()
        .filter_map(|separator| {
            data.windows(separator.len())
                .position(|window| window == separator)
                .map(|at| (at, separator.len()))
        })
        .min_by_key(|(at, _)| *at)
        .and_then(|(at, len)| Some((data.get(..at)?, data.get(at + len..)?)))
}

// ============================================================================
// Recording
// ============================================================================

/// Middleware saving each exchange under `dir`.
///
/// The request dump is written before forwarding. The response body is
/// buffered to be saved, and an equivalent response is returned.
#[must_use]
pub fn record(dir: impl Into<PathBuf>) -> Middleware {
    let dir: Arc<Path> = Arc::from(dir.into());
    Middleware::new(move |next: SharedExecutor| -> SharedExecutor {
        Arc::new(Record {
            dir: Arc::clone(&dir),
            next,
        })
    })
}

struct Record {
    dir: Arc<Path>,
    next: SharedExecutor,
}

impl Record {
    async fn exchange(dir: &Path, next: &SharedExecutor, request: Request) -> Result<Response> {
        let dump = dump_request(&request);
        let name = fixture_name(&request);

        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(format!("{name}{REQUEST_SUFFIX}")), &dump).await?;

        let response = next.execute(request).await?;
        let (status, headers, body) = response.into_parts();
        let body = body.bytes().await?;

        let dump = dump_response(status, &headers, &body);
        tokio::fs::write(dir.join(format!("{name}{RESPONSE_SUFFIX}")), &dump).await?;
        debug!(fixture = %name, status, "exchange recorded");

        Ok(Response::new(status, headers, body))
    }
}

impl Executor for Record {
    fn execute(&self, request: Request) -> ResponseFuture {
        let dir = Arc::clone(&self.dir);
        let next = Arc::clone(&self.next);

        Box::pin(async move { Self::exchange(&dir, &next, request).await })
    }
}

// ============================================================================
// Replaying
// ============================================================================

/// Executor answering every request with the response dump `data`.
pub fn replay_bytes(
    data: impl Into<Bytes>,
) -> ExecutorFn<impl Fn(Request) -> ResponseFuture + Send + Sync + 'static> {
    let data: Bytes = data.into();
    ExecutorFn::new(move |_request: Request| -> ResponseFuture {
        let data = data.clone();
        Box::pin(async move { parse_response(&data) })
    })
}

/// Executor answering from the fixtures saved under `dir`.
///
/// A request without fixture fails with [`Error::Io`].
pub fn replay(
    dir: impl Into<PathBuf>,
) -> ExecutorFn<impl Fn(Request) -> ResponseFuture + Send + Sync + 'static> {
    let dir: Arc<Path> = Arc::from(dir.into());
    ExecutorFn::new(move |request: Request| -> ResponseFuture {
        let path = response_path(&dir, &request);
        Box::pin(async move {
            let data = tokio::fs::read(&path).await?;
            parse_response(&data)
        })
    })
}

/// Like [`replay`], falling back to `next` when the fixture does not exist.
///
/// Wrap `next` with [`record`] to save the missing fixtures.
pub fn try_replay<E>(
    next: E,
    dir: impl Into<PathBuf>,
) -> ExecutorFn<impl Fn(Request) -> ResponseFuture + Send + Sync + 'static>
where
    E: Executor + 'static,
{
    let dir: Arc<Path> = Arc::from(dir.into());
    let next: SharedExecutor = Arc::new(next);
    ExecutorFn::new(move |request: Request| -> ResponseFuture {
        let path = response_path(&dir, &request);
        let next = Arc::clone(&next);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => parse_response(&data),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(fixture = %path.display(), "fixture missing, calling through");
                    next.execute(request).await
                }
                Err(err) => Err(err.into()),
            }
        })
    })
}

fn response_path(dir: &Path, request: &Request) -> PathBuf {
    dir.join(format!("{}{RESPONSE_SUFFIX}", fixture_name(request)))
}
