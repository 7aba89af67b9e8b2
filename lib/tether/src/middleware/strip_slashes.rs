//! URL path normalization middleware.

use tower::Layer;

use crate::{Executor, Request, ResponseFuture, SharedExecutor};

/// Layer collapsing repeated `/` in the request path.
///
/// With `strip_trailing`, a single trailing `/` is removed too, except for the
/// root path. Scheme, host, query and fragment are never touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripSlashesLayer {
    strip_trailing: bool,
}

impl StripSlashesLayer {
    /// Create a new layer.
    #[must_use]
    pub const fn new(strip_trailing: bool) -> Self {
        Self { strip_trailing }
    }
}

impl Layer<SharedExecutor> for StripSlashesLayer {
    type Service = StripSlashes;

    fn layer(&self, inner: SharedExecutor) -> Self::Service {
        StripSlashes {
            inner,
            strip_trailing: self.strip_trailing,
        }
    }
}

/// Executor normalizing the request path before forwarding.
#[derive(Clone)]
pub struct StripSlashes {
    inner: SharedExecutor,
    strip_trailing: bool,
}

impl Executor for StripSlashes {
    fn execute(&self, mut request: Request) -> ResponseFuture {
        let path = clean_path(request.url().path(), self.strip_trailing);
        if path != request.url().path() {
            request.url_mut().set_path(&path);
        }

        self.inner.execute(request)
    }
}

fn clean_path(path: &str, strip_trailing: bool) -> String {
    let mut cleaned = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && cleaned.ends_with('/') {
            continue;
        }
        cleaned.push(c);
    }

    if strip_trailing && cleaned.len() > 1 && cleaned.ends_with('/') {
        cleaned.pop();
    }
    cleaned
}
