//! Response handling: status gating, typed-error instantiation, and
//! type-directed entity extraction.

use crate::codec::{Codec, Encoding};
use crate::descriptor::{EntityShape, MethodDescriptor};
use crate::error::{Error, Result};
use crate::response::HttpResponse;
use crate::wire::{self, Base64Url, WireFormat};
use bytes::Bytes;
use http::Method;
use serde_json::Value;

/// Gates the response on the method's expected-status set.
///
/// An unexpected status materializes the body as text and instantiates
/// the declared error kind with the decoded body attached. When the body
/// cannot be decoded the typed error cannot be constructed, and the
/// failure degrades to a transport error carrying the original text.
pub(crate) async fn ensure_expected_status(
    descriptor: &MethodDescriptor,
    response: HttpResponse,
    codec: &dyn Codec,
    additional: &[u16],
) -> Result<HttpResponse> {
    let status = response.status();
    if descriptor.is_expected_status(status, additional) {
        return Ok(response);
    }

    let text = response.body_text().await?;
    tracing::error!(
        caller = descriptor.full_name(),
        status,
        body = %text,
        "unexpected response status"
    );

    let body = if text.is_empty() {
        None
    } else {
        let encoding = Encoding::from_headers(response.headers());
        match codec.deserialize(&text, encoding) {
            Ok(value) => Some(value),
            Err(_) => {
                return Err(Error::transport(format!(
                    "status code {status}, but a typed {} error could not be constructed. \
                     Response content: \"{text}\"",
                    descriptor.error_kind()
                )))
            }
        }
    };

    Err(Error::UnexpectedStatus {
        kind: descriptor.error_kind().to_string(),
        status,
        raw_body: text,
        body,
        headers: response.headers().clone(),
    })
}

/// Extracts the entity of `shape` from the response as a value tree,
/// applying wire-format remapping when the descriptor declares one.
pub(crate) async fn entity_value(
    descriptor: &MethodDescriptor,
    shape: &EntityShape,
    response: &HttpResponse,
    codec: &dyn Codec,
) -> Result<Value> {
    match shape {
        // No entity; the body stays untouched.
        EntityShape::Unit => Ok(Value::Null),
        EntityShape::Bool if descriptor.method() == Method::HEAD => {
            Ok(Value::Bool(response.is_success()))
        }
        EntityShape::Bytes => {
            let bytes = entity_bytes(descriptor, response, codec).await?;
            Ok(Value::Array(
                bytes.iter().map(|b| Value::from(*b as u64)).collect(),
            ))
        }
        EntityShape::ByteStream | EntityShape::ByteChunks => {
            Err(Error::UnsupportedReturnType {
                method: descriptor.full_name().to_string(),
                reason: "streaming entities have no value form; use the stream accessors"
                    .to_string(),
            })
        }
        EntityShape::Bool
        | EntityShape::DateTime
        | EntityShape::List(_)
        | EntityShape::Map(_)
        | EntityShape::Json => {
            let text = response.body_text().await?;
            let encoding = Encoding::from_headers(response.headers());
            let mut value = codec.deserialize(&text, encoding)?;
            if let Some(format) = descriptor.wire_format() {
                wire::remap_in_place(&mut value, shape, format)?;
            }
            Ok(value)
        }
    }
}

/// Extracts a raw-bytes entity. With a base64url wire format the body is
/// decoded as a string carrier first.
pub(crate) async fn entity_bytes(
    descriptor: &MethodDescriptor,
    response: &HttpResponse,
    codec: &dyn Codec,
) -> Result<Bytes> {
    match descriptor.wire_format() {
        Some(WireFormat::Base64Url) => {
            let text = response.body_text().await?;
            let encoding = Encoding::from_headers(response.headers());
            let carrier = codec.deserialize(&text, encoding)?;
            if carrier.is_null() {
                return Ok(Bytes::new());
            }
            let encoded = carrier.as_str().ok_or_else(|| {
                Error::serialization("response body", "expected a base64url string carrier")
            })?;
            Ok(Bytes::from(Base64Url::from_encoded(encoded).decoded_bytes()?))
        }
        _ => response.body_bytes().await,
    }
}
