//! The incoming response model.
//!
//! A [`HttpResponse`] carries its body as a deferred buffer: the transport
//! hands over a future that yields the bytes, and the first projection
//! that needs them resolves it and memoizes the result. All four
//! projections (bytes, text, async reader, chunk stream) derive from that
//! one buffer, so each is idempotent on a given response.

use crate::error::{Error, Result};
use crate::headers::Headers;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::Stream;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{Mutex, OnceCell};

/// An HTTP response flowing back through the policy pipeline.
pub struct HttpResponse {
    status: u16,
    headers: Headers,
    body: ResponseBody,
}

impl HttpResponse {
    /// Creates a response from its parts.
    pub fn new(status: u16, headers: Headers, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// `true` when `200 <= status < 300`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The full body as bytes. Resolves the underlying source on first
    /// call; subsequent calls return the memoized buffer.
    pub async fn body_bytes(&self) -> Result<Bytes> {
        self.body.bytes().await
    }

    /// The full body decoded as text (lossy UTF-8).
    pub async fn body_text(&self) -> Result<String> {
        let bytes = self.body.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// The body as an async reader over the memoized buffer.
    pub async fn body_reader(&self) -> Result<Cursor<Bytes>> {
        let bytes = self.body.bytes().await?;
        Ok(Cursor::new(bytes))
    }

    /// The body as a lazy chunk sequence. A buffered transport yields the
    /// whole body as a single chunk.
    pub async fn body_chunks(&self) -> Result<ByteChunks> {
        let bytes = self.body.bytes().await?;
        Ok(ByteChunks::single(bytes))
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

type BodyFuture = BoxFuture<'static, Result<Bytes>>;

/// Deferred response body: a one-shot source resolved into a memoized
/// buffer on first demand.
pub struct ResponseBody {
    buffer: OnceCell<Bytes>,
    source: Mutex<Option<BodyFuture>>,
}

impl ResponseBody {
    /// A body whose bytes are already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            buffer: OnceCell::new_with(Some(bytes.into())),
            source: Mutex::new(None),
        }
    }

    /// An empty body.
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// A body backed by a future the transport will resolve on demand.
    pub fn deferred<F>(source: F) -> Self
    where
        F: std::future::Future<Output = Result<Bytes>> + Send + 'static,
    {
        Self {
            buffer: OnceCell::new(),
            source: Mutex::new(Some(Box::pin(source))),
        }
    }

    async fn bytes(&self) -> Result<Bytes> {
        let bytes = self
            .buffer
            .get_or_try_init(|| async {
                let source = self.source.lock().await.take();
                match source {
                    Some(fut) => fut.await,
                    // The source was consumed by a failed earlier read.
                    None => Err(Error::transport("response body is no longer available")),
                }
            })
            .await?;
        Ok(bytes.clone())
    }
}

/// Lazy sequence of body chunks.
///
/// Implements [`futures::Stream`]; a non-streaming transport satisfies
/// the contract by re-emitting the memoized buffer as one chunk.
#[derive(Debug)]
pub struct ByteChunks {
    remaining: Option<Bytes>,
}

impl ByteChunks {
    fn single(bytes: Bytes) -> Self {
        Self {
            remaining: if bytes.is_empty() {
                None
            } else {
                Some(bytes)
            },
        }
    }
}

impl Stream for ByteChunks {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.remaining.take().map(Ok))
    }
}

/// The status+headers+body envelope result shape.
///
/// `headers` is the typed projection of the response headers (deserialized
/// from a lower-cased name dictionary); `raw_headers` preserves every
/// header with its original casing.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse<H, B> {
    /// The HTTP status code.
    pub status: u16,
    /// The typed headers, or `()` when the method declares none.
    pub headers: H,
    /// All response headers, original-case names.
    pub raw_headers: BTreeMap<String, String>,
    /// The typed body.
    pub body: B,
}

impl<H: DeserializeOwned, B> RestResponse<H, B> {
    pub(crate) fn assemble(
        status: u16,
        typed_headers: serde_json::Value,
        raw_headers: BTreeMap<String, String>,
        body: B,
    ) -> Result<Self> {
        let headers = serde_json::from_value(typed_headers)
            .map_err(|e| Error::serialization("response headers", e.to_string()))?;
        Ok(Self {
            status,
            headers,
            raw_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::io::AsyncReadExt;

    fn response_with(body: &str) -> HttpResponse {
        HttpResponse::new(
            200,
            Headers::new(),
            ResponseBody::from_bytes(body.as_bytes().to_vec()),
        )
    }

    #[tokio::test]
    async fn test_projections_are_idempotent() {
        let response = response_with("hello");
        assert_eq!(&response.body_bytes().await.unwrap()[..], b"hello");
        assert_eq!(response.body_text().await.unwrap(), "hello");
        // A second pass over every projection sees the same buffer.
        assert_eq!(&response.body_bytes().await.unwrap()[..], b"hello");
        assert_eq!(response.body_text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_deferred_source_resolved_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let response = HttpResponse::new(
            200,
            Headers::new(),
            ResponseBody::deferred(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(b"once"))
            }),
        );

        assert_eq!(&response.body_bytes().await.unwrap()[..], b"once");
        assert_eq!(&response.body_bytes().await.unwrap()[..], b"once");
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reader_projection() {
        let response = response_with("stream me");
        let mut reader = response.body_reader().await.unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "stream me");
    }

    #[tokio::test]
    async fn test_chunks_projection_single_chunk() {
        let response = response_with("one chunk");
        let chunks: Vec<Bytes> = response
            .body_chunks()
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec![Bytes::from_static(b"one chunk")]);
    }

    #[tokio::test]
    async fn test_empty_body_yields_no_chunks() {
        let response = response_with("");
        let chunks: Vec<_> = response.body_chunks().await.unwrap().collect().await;
        assert!(chunks.is_empty());
    }
}
