//! The outgoing request model.

use crate::body::RequestBody;
use crate::headers::Headers;
use http::Method;

/// A concrete HTTP request produced by the request builder and carried
/// through the policy pipeline to the transport.
///
/// `caller` is the fully-qualified name of the interface method that
/// produced the request; it exists purely for diagnostics.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    caller: String,
    method: Method,
    url: String,
    headers: Headers,
    body: Option<RequestBody>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(caller: impl Into<String>, method: Method, url: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// The diagnostic label of the originating interface method.
    pub fn caller(&self) -> &str {
        &self.caller
    }

    /// The HTTP verb.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Mutable access to the verb, for policies that rewrite it.
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// The absolute URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replaces the URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// The request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Sets a header, replacing any existing value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// The body, if one is attached.
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Attaches a body.
    pub fn set_body(&mut self, body: RequestBody) {
        self.body = Some(body);
    }
}
