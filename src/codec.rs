//! The body codec boundary.
//!
//! The engine exchanges self-describing [`serde_json::Value`] trees with
//! the codec; typed request bodies are lowered to a `Value` before
//! serialization and typed results are raised from one after wire-format
//! remapping. [`JsonCodec`] is the default; an XML-capable codec can be
//! swapped in behind the same trait.

use crate::error::{Error, Result};
use crate::headers::Headers;
use serde_json::Value;

/// The serialization encodings a codec can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// JSON bodies.
    Json,
    /// XML bodies.
    Xml,
}

impl Encoding {
    /// Derives the encoding from a `Content-Type` value.
    ///
    /// The value is split on `;` and each segment compared trimmed and
    /// case-insensitively: `application/json` selects JSON,
    /// `application/xml` or `text/xml` selects XML, anything else
    /// (including no header at all) defaults to JSON.
    pub fn from_content_type(content_type: Option<&str>) -> Encoding {
        if let Some(content_type) = content_type {
            if media_type_matches(content_type, &["application/json"]) {
                return Encoding::Json;
            }
            if media_type_matches(content_type, &["application/xml", "text/xml"]) {
                return Encoding::Xml;
            }
        }
        Encoding::Json
    }

    /// Derives the encoding from a header map's `Content-Type`.
    pub fn from_headers(headers: &Headers) -> Encoding {
        Encoding::from_content_type(headers.value("Content-Type"))
    }
}

/// Returns `true` when any `;`-delimited segment of `content_type`
/// equals one of `candidates`, compared trimmed and case-insensitively.
pub(crate) fn media_type_matches(content_type: &str, candidates: &[&str]) -> bool {
    content_type.split(';').any(|segment| {
        let segment = segment.trim();
        candidates.iter().any(|c| segment.eq_ignore_ascii_case(c))
    })
}

/// Converts between body text and self-describing values.
///
/// Implementations must be internally thread-safe; one codec instance is
/// shared by every invocation on a binding.
pub trait Codec: Send + Sync {
    /// Serializes a value to body text in the given encoding.
    fn serialize(&self, value: &Value, encoding: Encoding) -> Result<String>;

    /// Deserializes body text into a value. Empty text decodes to
    /// `Value::Null`.
    fn deserialize(&self, text: &str, encoding: Encoding) -> Result<Value>;
}

/// The default codec: serde_json for JSON, with XML reported as
/// unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn serialize(&self, value: &Value, encoding: Encoding) -> Result<String> {
        match encoding {
            Encoding::Json => serde_json::to_string(value)
                .map_err(|e| Error::serialization("request body", e.to_string())),
            Encoding::Xml => Err(Error::serialization(
                "request body",
                "XML encoding requires an XML-capable codec",
            )),
        }
    }

    fn deserialize(&self, text: &str, encoding: Encoding) -> Result<Value> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        match encoding {
            Encoding::Json => serde_json::from_str(text)
                .map_err(|e| Error::serialization("response body", e.to_string())),
            Encoding::Xml => Err(Error::serialization(
                "response body",
                "XML encoding requires an XML-capable codec",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encoding_from_content_type() {
        assert_eq!(
            Encoding::from_content_type(Some("application/json")),
            Encoding::Json
        );
        assert_eq!(
            Encoding::from_content_type(Some("application/json; charset=utf-8")),
            Encoding::Json
        );
        assert_eq!(
            Encoding::from_content_type(Some("charset=utf-8; APPLICATION/JSON")),
            Encoding::Json
        );
        assert_eq!(
            Encoding::from_content_type(Some("application/xml")),
            Encoding::Xml
        );
        assert_eq!(
            Encoding::from_content_type(Some("text/xml; charset=utf-8")),
            Encoding::Xml
        );
        assert_eq!(
            Encoding::from_content_type(Some("text/plain")),
            Encoding::Json
        );
        assert_eq!(Encoding::from_content_type(None), Encoding::Json);
    }

    #[test]
    fn test_json_round_trip() {
        let codec = JsonCodec;
        let value = json!({"id": "a/b", "n": 1});
        let text = codec.serialize(&value, Encoding::Json).unwrap();
        assert_eq!(codec.deserialize(&text, Encoding::Json).unwrap(), value);
    }

    #[test]
    fn test_empty_text_decodes_to_null() {
        let codec = JsonCodec;
        assert_eq!(
            codec.deserialize("", Encoding::Json).unwrap(),
            Value::Null
        );
        assert_eq!(
            codec.deserialize("  \n", Encoding::Json).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_xml_is_reported_unsupported() {
        let codec = JsonCodec;
        assert!(matches!(
            codec.deserialize("<a/>", Encoding::Xml),
            Err(crate::Error::Serialization { .. })
        ));
    }
}
