//! URL assembly for outgoing requests.
//!
//! [`UrlBuilder`] composes an absolute URL from scheme, host, path, and an
//! ordered list of query pairs. Values handed to the builder are inserted
//! verbatim; percent-encoding is the caller's job (the request builder
//! encodes binding values unless they are declared pre-encoded).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

/// Characters escaped when encoding a binding value for the path or query
/// component. Everything except RFC 3986 unreserved characters is encoded,
/// so a value containing `/` or `&` cannot break out of its segment.
const VALUE_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a binding value per RFC 3986.
pub fn encode_value(value: &str) -> String {
    utf8_percent_encode(value, VALUE_ESCAPE).to_string()
}

/// Builder for an absolute request URL.
///
/// Query pairs keep insertion order, which reflects the descriptor's
/// declaration order.
///
/// # Examples
///
/// ```
/// use restbind::url::UrlBuilder;
///
/// let url = UrlBuilder::new()
///     .with_scheme("https")
///     .with_host("api.example.com")
///     .with_path("/items/a%2Fb")
///     .with_query_parameter("page", "2")
///     .build();
/// assert_eq!(url, "https://api.example.com/items/a%2Fb?page=2");
/// ```
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder {
    scheme: Option<String>,
    host: Option<String>,
    path: Option<String>,
    query: Vec<(String, String)>,
}

impl UrlBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the URL scheme (`http`, `https`).
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Sets the host. A trailing `/` is trimmed.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.host = Some(host.trim_end_matches('/').to_string());
        self
    }

    /// Sets the path. A leading `/` is added when missing.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if path.is_empty() || path.starts_with('/') {
            self.path = Some(path);
        } else {
            self.path = Some(format!("/{path}"));
        }
        self
    }

    /// Appends a query pair. The value must already be encoded.
    pub fn with_query_parameter(
        mut self,
        name: impl Into<String>,
        encoded_value: impl Into<String>,
    ) -> Self {
        self.query.push((name.into(), encoded_value.into()));
        self
    }

    /// Assembles the URL string.
    pub fn build(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for UrlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        if let Some(host) = &self.host {
            write!(f, "{host}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "{path}")?;
        }
        for (i, (name, value)) in self.query.iter().enumerate() {
            let separator = if i == 0 { '?' } else { '&' };
            write!(f, "{separator}{name}={value}")?;
        }
        Ok(())
    }
}
