//! Error types for the client engine.
//!
//! Every failure surfaced by the engine is one of the six kinds below.
//! Parse-time kinds ([`Error::MalformedInterface`],
//! [`Error::UnsupportedReturnType`]) are returned synchronously when a
//! service binding is constructed; everything else surfaces from an
//! invocation, either on the returned future or when a blocking adapter
//! resolves it.

use crate::headers::Headers;

/// The main error type for declarative service calls.
///
/// Unexpected-status errors preserve the raw response text and, when the
/// body could be decoded, the typed error body, so callers keep full
/// debugging context.
///
/// # Examples
///
/// ```no_run
/// use restbind::{Arg, Error, ServiceClient};
///
/// # async fn example(client: ServiceClient) {
/// match client.invoke::<serde_json::Value>("getWidget", &[Arg::text("w1")]).await {
///     Ok(widget) => println!("widget: {widget}"),
///     Err(Error::UnexpectedStatus { status, raw_body, .. }) => {
///         eprintln!("service rejected the call with {status}: {raw_body}");
///     }
///     Err(e) => eprintln!("call failed: {e}"),
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A method descriptor could not be built from its declaration.
    ///
    /// Raised at binding construction for problems such as a path
    /// placeholder with no matching PATH binding, more than one BODY
    /// binding, or an empty expected-status set.
    #[error("malformed interface: {method}: {reason}")]
    MalformedInterface {
        /// Fully-qualified method name (`Service.method`).
        method: String,
        /// What was wrong with the declaration.
        reason: String,
    },

    /// The declared return shape is not one the engine can produce.
    #[error("unsupported return type for {method}: {reason}")]
    UnsupportedReturnType {
        /// Fully-qualified method name.
        method: String,
        /// Why the shape was rejected.
        reason: String,
    },

    /// A network-level failure: connection, DNS, I/O, or timeout inside
    /// the transport.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The codec failed to encode a request body or decode a response
    /// body.
    #[error("serialization error in {context}: {message}")]
    Serialization {
        /// What was being (de)serialized.
        context: String,
        /// The underlying codec error.
        message: String,
    },

    /// The response status was outside the method's expected set.
    ///
    /// `body` holds the decoded error body when the response carried one
    /// that the codec understood; `raw_body` always holds the text as
    /// received.
    #[error("{kind}: status code {status}, {raw_body}")]
    UnexpectedStatus {
        /// The error kind declared on the method.
        kind: String,
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        raw_body: String,
        /// The decoded error body, when present and decodable.
        body: Option<serde_json::Value>,
        /// The response headers.
        headers: Headers,
    },

    /// The invocation was cancelled cooperatively (dropped future or an
    /// elapsed timeout composition).
    #[error("invocation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn serialization(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Serialization {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error is potentially retryable.
    ///
    /// Transport failures and 408/429/5xx unexpected statuses are
    /// retryable; cancellation and everything decided at parse time is
    /// not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::UnexpectedStatus { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            Error::MalformedInterface { .. }
            | Error::UnsupportedReturnType { .. }
            | Error::Serialization { .. }
            | Error::Cancelled => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error preserved one.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Error::UnexpectedStatus { raw_body, .. } => Some(raw_body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport {
            message: e.to_string(),
        }
    }
}

/// A specialized `Result` type for service calls.
pub type Result<T> = std::result::Result<T, Error>;
