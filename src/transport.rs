//! The transport boundary and the default reqwest-backed transport.

use crate::body::RequestBody;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::request::HttpRequest;
use crate::response::{HttpResponse, ResponseBody};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Sends a fully-built request and yields an eventual response.
///
/// A transport performs exactly one exchange per call: it never retries
/// internally (retry is a pipeline concern), and dropping the returned
/// future must abort in-flight I/O.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the exchange.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Whether the transport can emit a native PATCH. When `false`, the
    /// pipeline rewrites PATCH to POST with `X-HTTP-Method-Override`.
    fn supports_patch(&self) -> bool {
        true
    }
}

/// The default transport over a pooled [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with a fresh client.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client, keeping its pool and configuration.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Reads the byte range of a file segment body.
async fn read_file_segment(segment: &crate::body::FileSegment) -> Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(segment.path()).await?;
    file.seek(std::io::SeekFrom::Start(segment.offset())).await?;
    let mut data = Vec::with_capacity(segment.length() as usize);
    file.take(segment.length()).read_to_end(&mut data).await?;
    Ok(data)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = reqwest::Url::parse(request.url())
            .map_err(|e| Error::transport(format!("invalid request URL {}: {e}", request.url())))?;
        let mut outgoing = self.client.request(request.method().clone(), url);

        for (name, value) in request.headers().iter() {
            outgoing = outgoing.header(name, value);
        }

        match request.body() {
            Some(RequestBody::Bytes { data, .. }) => {
                outgoing = outgoing.body(data.clone());
            }
            Some(RequestBody::Text { text, .. }) => {
                outgoing = outgoing.body(text.clone());
            }
            Some(RequestBody::File(segment)) => {
                outgoing = outgoing.body(read_file_segment(segment).await?);
            }
            None => {}
        }

        let response = outgoing.send().await?;

        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            // Repeated names collapse into one comma-joined value.
            headers.add(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }

        let body = ResponseBody::deferred(async move {
            response.bytes().await.map_err(Error::from)
        });

        Ok(HttpResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_file_segment_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let segment = crate::body::FileSegment::new(file.path(), 2, 5);
        let data = read_file_segment(&segment).await.unwrap();
        assert_eq!(data, b"23456");
    }

    #[tokio::test]
    async fn test_read_file_segment_past_end_is_truncated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();

        let segment = crate::body::FileSegment::new(file.path(), 1, 100);
        let data = read_file_segment(&segment).await.unwrap();
        assert_eq!(data, b"bc");
    }
}
