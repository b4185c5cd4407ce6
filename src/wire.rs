//! Wire formats and carrier types.
//!
//! Some services transmit a value in a representation different from the
//! one the caller wants back: bytes as base64url text, datetimes as
//! RFC 1123 strings or epoch seconds. A method descriptor records that as
//! an optional [`WireFormat`], and the response handler remaps the decoded
//! value tree — recursively through lists, maps, and envelope bodies —
//! from the carrier form to the declared result form.
//!
//! The carrier types ([`Base64Url`], [`Rfc1123DateTime`], [`UnixTime`])
//! serialize as their wire representation, so they are also usable
//! directly in request and response schemas.

use crate::descriptor::EntityShape;
use crate::error::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// The on-the-wire representation of a method's result entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Bytes carried as a base64url string.
    Base64Url,
    /// Datetimes carried as RFC 1123 strings.
    Rfc1123,
    /// Datetimes carried as integer epoch seconds.
    UnixEpoch,
}

/// Base64url-encoded bytes carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Url(String);

impl Base64Url {
    /// Encodes raw bytes into their base64url form.
    pub fn encode(bytes: &[u8]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps an already-encoded string.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes back to raw bytes.
    pub fn decoded_bytes(&self) -> Result<Vec<u8>> {
        URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|e| Error::serialization("base64url value", e.to_string()))
    }
}

impl Serialize for Base64Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Base64Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Self(String::deserialize(deserializer)?))
    }
}

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// RFC 1123 datetime carrier (`Sun, 06 Nov 1994 08:49:37 GMT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rfc1123DateTime(DateTime<Utc>);

impl Rfc1123DateTime {
    /// Wraps a datetime.
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Parses the RFC 1123 wire form.
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_rfc2822(text)
            .map_err(|e| Error::serialization("RFC1123 datetime", e.to_string()))?;
        Ok(Self(parsed.with_timezone(&Utc)))
    }

    /// The carried datetime.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Rfc1123DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(RFC1123_FORMAT))
    }
}

impl Serialize for Rfc1123DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rfc1123DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Rfc1123DateTime::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Epoch-seconds datetime carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnixTime(DateTime<Utc>);

impl UnixTime {
    /// Wraps a datetime. Sub-second precision is dropped on the wire.
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Builds from epoch seconds.
    pub fn from_seconds(seconds: i64) -> Result<Self> {
        match Utc.timestamp_opt(seconds, 0) {
            chrono::LocalResult::Single(dt) => Ok(Self(dt)),
            _ => Err(Error::serialization(
                "unix-epoch datetime",
                format!("{seconds} is out of range"),
            )),
        }
    }

    /// Epoch seconds of the carried datetime.
    pub fn seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// The carried datetime.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Serialize for UnixTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.seconds())
    }
}

impl<'de> Deserialize<'de> for UnixTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        UnixTime::from_seconds(seconds).map_err(serde::de::Error::custom)
    }
}

/// Remaps a decoded value tree from its wire form to the declared result
/// form, in place.
///
/// The walk follows the entity shape: byte and datetime slots are
/// rewritten from their carrier representation, list elements and map
/// values recurse, and every other shape passes through untouched — so a
/// container none of whose slots carry a wire form comes back
/// identity-equal.
///
/// Rewritten concrete forms are what the final typed deserialization
/// accepts: base64url strings become byte arrays, RFC 1123 strings and
/// epoch integers become RFC 3339 strings.
pub(crate) fn remap_in_place(value: &mut Value, shape: &EntityShape, wire: WireFormat) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    match shape {
        EntityShape::Bytes => {
            if wire == WireFormat::Base64Url {
                let encoded = value.as_str().ok_or_else(|| {
                    Error::serialization("base64url value", "expected a string carrier")
                })?;
                let decoded = Base64Url::from_encoded(encoded).decoded_bytes()?;
                *value = Value::Array(decoded.into_iter().map(|b| Value::from(b as u64)).collect());
            }
            Ok(())
        }
        EntityShape::DateTime => {
            match wire {
                WireFormat::Rfc1123 => {
                    let text = value.as_str().ok_or_else(|| {
                        Error::serialization("RFC1123 datetime", "expected a string carrier")
                    })?;
                    let datetime = Rfc1123DateTime::parse(text)?.as_datetime();
                    *value = Value::String(datetime.to_rfc3339_opts(SecondsFormat::Secs, true));
                }
                WireFormat::UnixEpoch => {
                    let seconds = value.as_i64().ok_or_else(|| {
                        Error::serialization("unix-epoch datetime", "expected an integer carrier")
                    })?;
                    let datetime = UnixTime::from_seconds(seconds)?.as_datetime();
                    *value = Value::String(datetime.to_rfc3339_opts(SecondsFormat::Secs, true));
                }
                WireFormat::Base64Url => {}
            }
            Ok(())
        }
        EntityShape::List(element) => {
            if let Value::Array(items) = value {
                for item in items {
                    remap_in_place(item, element, wire)?;
                }
                Ok(())
            } else {
                Err(Error::serialization("wire remap", "expected an array"))
            }
        }
        EntityShape::Map(element) => {
            if let Value::Object(entries) = value {
                for entry in entries.values_mut() {
                    remap_in_place(entry, element, wire)?;
                }
                Ok(())
            } else {
                Err(Error::serialization("wire remap", "expected an object"))
            }
        }
        EntityShape::Unit
        | EntityShape::Bool
        | EntityShape::ByteStream
        | EntityShape::ByteChunks
        | EntityShape::Json => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base64url_round_trip() {
        let carrier = Base64Url::encode(&[0x01, 0x02, 0x03]);
        assert_eq!(carrier.as_str(), "AQID");
        assert_eq!(carrier.decoded_bytes().unwrap(), vec![0x01, 0x02, 0x03]);

        let serialized = serde_json::to_string(&carrier).unwrap();
        assert_eq!(serialized, "\"AQID\"");
        let back: Base64Url = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back, carrier);
    }

    #[test]
    fn test_rfc1123_round_trip() {
        let datetime = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        let carrier = Rfc1123DateTime::new(datetime);
        assert_eq!(carrier.to_string(), "Sun, 06 Nov 1994 08:49:37 GMT");

        let serialized = serde_json::to_string(&carrier).unwrap();
        let back: Rfc1123DateTime = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back.as_datetime(), datetime);
    }

    #[test]
    fn test_unix_time_round_trip() {
        let datetime = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        let carrier = UnixTime::new(datetime);

        let serialized = serde_json::to_string(&carrier).unwrap();
        assert_eq!(serialized, datetime.timestamp().to_string());
        let back: UnixTime = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back.as_datetime(), datetime);
    }

    #[test]
    fn test_remap_base64url_bytes() {
        let mut value = json!("AQID");
        remap_in_place(&mut value, &EntityShape::Bytes, WireFormat::Base64Url).unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn test_remap_rfc1123_list() {
        let mut value = json!(["Sun, 06 Nov 1994 08:49:37 GMT"]);
        remap_in_place(
            &mut value,
            &EntityShape::List(Box::new(EntityShape::DateTime)),
            WireFormat::Rfc1123,
        )
        .unwrap();
        assert_eq!(value, json!(["1994-11-06T08:49:37Z"]));
    }

    #[test]
    fn test_remap_unix_epoch_map_values_only() {
        let mut value = json!({"784111777": 784111777});
        remap_in_place(
            &mut value,
            &EntityShape::Map(Box::new(EntityShape::DateTime)),
            WireFormat::UnixEpoch,
        )
        .unwrap();
        assert_eq!(value, json!({"784111777": "1994-11-06T08:49:37Z"}));
    }

    #[test]
    fn test_remap_identity_when_no_carrier_slots() {
        let original = json!({"name": "n", "values": [1, 2, 3]});
        let mut value = original.clone();
        remap_in_place(&mut value, &EntityShape::Json, WireFormat::Base64Url).unwrap();
        assert_eq!(value, original);
    }

    #[test]
    fn test_remap_null_passes_through() {
        let mut value = Value::Null;
        remap_in_place(&mut value, &EntityShape::DateTime, WireFormat::Rfc1123).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_remap_nested_lists() {
        let mut value = json!([["AQID"], []]);
        let shape = EntityShape::List(Box::new(EntityShape::List(Box::new(EntityShape::Bytes))));
        remap_in_place(&mut value, &shape, WireFormat::Base64Url).unwrap();
        assert_eq!(value, json!([[[1, 2, 3]], []]));
    }

    #[test]
    fn test_remap_rejects_wrong_carrier() {
        let mut value = json!(42);
        let err =
            remap_in_place(&mut value, &EntityShape::Bytes, WireFormat::Base64Url).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
