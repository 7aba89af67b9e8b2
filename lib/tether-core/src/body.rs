//! Response bodies and body serialization helpers.
//!
//! A [`Body`] is either fully buffered or a stream of chunks. Bodies produced
//! by a transport are usually bound to the request [`Context`]: every chunk
//! read then races the request deadline, even long after the response head
//! was returned.

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

use crate::{Context, Result};

/// A stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

enum Inner {
    Full(Bytes),
    Stream(BodyStream),
}

/// Response body.
///
/// Reading consumes the body; dropping it releases the underlying stream.
pub struct Body {
    inner: Inner,
    context: Option<Context>,
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Body");
        match &self.inner {
            Inner::Full(bytes) => debug.field("len", &bytes.len()),
            Inner::Stream(_) => debug.field("stream", &true),
        };
        debug.field("bound", &self.context.is_some()).finish()
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Body {
    /// An empty body.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            inner: Inner::Full(Bytes::new()),
            context: None,
        }
    }

    /// A fully buffered body.
    #[must_use]
    pub fn full(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: Inner::Full(bytes.into()),
            context: None,
        }
    }

    /// A streaming body.
    #[must_use]
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Inner::Stream(Box::pin(stream)),
            context: None,
        }
    }

    /// Bind reads of this body to `context`.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// The context reads are bound to, if any.
    #[must_use]
    pub const fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Returns `true` for a streaming body.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self.inner, Inner::Stream(_))
    }

    /// The buffered bytes of a full body that was not read yet.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match &self.inner {
            Inner::Full(bytes) => Some(bytes),
            Inner::Stream(_) => None,
        }
    }

    /// Read the next chunk, `None` once the body is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the stream error, or the context error when the bound context
    /// ends before the chunk arrives.
    pub async fn chunk(&mut self) -> Option<Result<Bytes>> {
        let Self { inner, context } = self;
        match context {
            Some(context) => match context.run(async { Ok(next_chunk(inner).await) }).await {
                Ok(chunk) => chunk,
                Err(err) => Some(Err(err)),
            },
            None => next_chunk(inner).await,
        }
    }

    /// Read the whole body.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error.
    pub async fn bytes(mut self) -> Result<Bytes> {
        if let (Inner::Full(bytes), None) = (&self.inner, &self.context) {
            return Ok(bytes.clone());
        }

        let mut collected = BytesMut::new();
        while let Some(chunk) = self.chunk().await {
            collected.extend_from_slice(&chunk?);
        }
        Ok(collected.freeze())
    }
}

async fn next_chunk(inner: &mut Inner) -> Option<Result<Bytes>> {
    match inner {
        Inner::Full(bytes) if bytes.is_empty() => None,
        Inner::Full(bytes) => Some(Ok(std::mem::take(bytes))),
        Inner::Stream(stream) => stream.next().await,
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::full(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::full(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::full(text)
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// # Errors
///
/// Returns an error if form serialization fails.
pub fn to_form<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_urlencoded::to_string(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes, reporting the path of the failing field.
///
/// # Errors
///
/// Returns [`Error::JsonDeserialization`](crate::Error::JsonDeserialization)
/// with the path to the problematic field (e.g. `user.address.city`).
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
