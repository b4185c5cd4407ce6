//! Method declarations and descriptors.
//!
//! A service interface is declared as data: a [`ServiceSpec`] carries one
//! [`MethodSpec`] per operation, each describing the verb, URL template,
//! parameter bindings, expected statuses, error kind, and return shape.
//! Binding the spec validates every declaration and yields frozen
//! [`MethodDescriptor`] plans, cached per method name; the descriptor is
//! the single source of truth the request builder, response handler, and
//! façade all consult.

use crate::body::FileSegment;
use crate::error::{Error, Result};
use crate::wire::WireFormat;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Where a bound parameter lands in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Substituted into a `{name}` path placeholder.
    Path,
    /// Appended to the query string.
    Query,
    /// Set as a request header.
    Header,
    /// Substituted into a `{name}` host template token.
    Host,
}

/// One parameter binding: where argument `index` goes, under which name,
/// and whether the caller already percent-encoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub(crate) kind: BindingKind,
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) encoded: bool,
}

/// A constant header applied to every request of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLiteral {
    pub(crate) name: String,
    pub(crate) value: String,
}

/// The body binding: which argument is the body, and the declared
/// content type when the method carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyBinding {
    pub(crate) index: usize,
    pub(crate) content_type: Option<String>,
}

/// The shape of the entity a method produces, as a tree so wire-format
/// remapping can recurse through containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityShape {
    /// No entity; the body is discarded.
    Unit,
    /// A boolean. On HEAD methods this reports request success instead of
    /// reading a body.
    Bool,
    /// Raw bytes.
    Bytes,
    /// A UTC datetime.
    DateTime,
    /// The body as an async reader, not deserialized.
    ByteStream,
    /// The body as a lazy chunk sequence, not deserialized.
    ByteChunks,
    /// A list of entities.
    List(Box<EntityShape>),
    /// A string-keyed map; only values participate in remapping.
    Map(Box<EntityShape>),
    /// Any serde-deserializable schema, opaque to the engine.
    Json,
}

/// The outermost result type: the entity alone, or wrapped in the
/// status+headers+body envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    /// The entity alone.
    Entity(EntityShape),
    /// A [`RestResponse`](crate::RestResponse) envelope around the entity.
    WithResponse {
        /// Whether the method declares a typed headers struct.
        typed_headers: bool,
        /// The body entity shape.
        body: EntityShape,
    },
}

impl ResultShape {
    /// The entity shape of the (possibly enveloped) body.
    pub fn body_shape(&self) -> &EntityShape {
        match self {
            ResultShape::Entity(shape) => shape,
            ResultShape::WithResponse { body, .. } => body,
        }
    }
}

/// How the caller receives the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// An async future yielding the typed result.
    Future,
    /// Block until the typed result is available.
    Sync,
    /// Block, discard the result.
    Void,
    /// An async future that completes once the response is consumed,
    /// discarding the body.
    Completion,
}

/// A positional invocation argument.
///
/// Bindings reference arguments by index; the variant decides how the
/// value can be rendered (text for path/query/header bindings, any
/// variant for the body).
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// An absent value: omitted from the query, no body.
    None,
    /// A text value.
    Text(String),
    /// Raw bytes, valid only as a body.
    Bytes(Vec<u8>),
    /// A file segment, valid only as a body.
    File(FileSegment),
    /// A structured value serialized through the codec.
    Json(Value),
}

impl Arg {
    /// A text argument.
    pub fn text(value: impl Into<String>) -> Self {
        Arg::Text(value.into())
    }

    /// A raw-bytes argument.
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Arg::Bytes(value.into())
    }

    /// A file-segment argument.
    pub fn file(segment: FileSegment) -> Self {
        Arg::File(segment)
    }

    /// A structured argument, lowered through serde.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Arg::Json(serde_json::to_value(value).map_err(|e| {
            Error::serialization("request argument", e.to_string())
        })?))
    }

    /// Renders the argument as binding text, or `None` for absent values.
    pub(crate) fn render_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Arg::None | Arg::Json(Value::Null) => None,
            Arg::Text(s) => Some(Cow::Borrowed(s)),
            Arg::Json(Value::String(s)) => Some(Cow::Borrowed(s)),
            Arg::Json(Value::Number(n)) => Some(Cow::Owned(n.to_string())),
            Arg::Json(Value::Bool(b)) => Some(Cow::Owned(b.to_string())),
            Arg::Json(_) | Arg::Bytes(_) | Arg::File(_) => None,
        }
    }

    pub(crate) fn is_absent(&self) -> bool {
        matches!(self, Arg::None)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

/// Declaration of one interface method.
///
/// Built fluently and handed to [`ServiceSpec::method`]; nothing is
/// validated until the spec is bound.
///
/// # Examples
///
/// ```
/// use restbind::{EntityShape, MethodSpec};
///
/// let spec = MethodSpec::get("getItem", "/items/{id}")
///     .path_param("id", 0)
///     .query_param("verbose", 1)
///     .returns(EntityShape::Json);
/// # let _ = spec;
/// ```
#[derive(Debug, Clone)]
pub struct MethodSpec {
    name: String,
    method: Method,
    path: String,
    bindings: Vec<ParamBinding>,
    header_literals: Vec<HeaderLiteral>,
    bodies: Vec<BodyBinding>,
    expected_statuses: Option<Vec<u16>>,
    error_kind: Option<String>,
    wire: Option<WireFormat>,
    result: ResultShape,
    shape: ReturnShape,
    invalid_sequence: Option<EntityShape>,
}

impl MethodSpec {
    /// Declares a method with an explicit verb.
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            bindings: Vec::new(),
            header_literals: Vec::new(),
            bodies: Vec::new(),
            expected_statuses: None,
            error_kind: None,
            wire: None,
            result: ResultShape::Entity(EntityShape::Unit),
            shape: ReturnShape::Future,
            invalid_sequence: None,
        }
    }

    /// Declares a GET method.
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::GET, path)
    }

    /// Declares a POST method.
    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::POST, path)
    }

    /// Declares a PUT method.
    pub fn put(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::PUT, path)
    }

    /// Declares a PATCH method.
    pub fn patch(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::PATCH, path)
    }

    /// Declares a DELETE method.
    pub fn delete(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::DELETE, path)
    }

    /// Declares a HEAD method.
    pub fn head(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::HEAD, path)
    }

    fn binding(mut self, kind: BindingKind, name: impl Into<String>, index: usize, encoded: bool) -> Self {
        self.bindings.push(ParamBinding {
            kind,
            name: name.into(),
            index,
            encoded,
        });
        self
    }

    /// Binds argument `index` to the `{name}` path placeholder; the value
    /// is percent-encoded on substitution.
    pub fn path_param(self, name: impl Into<String>, index: usize) -> Self {
        self.binding(BindingKind::Path, name, index, false)
    }

    /// Like [`path_param`](Self::path_param) for values the caller has
    /// already encoded; substituted verbatim.
    pub fn path_param_encoded(self, name: impl Into<String>, index: usize) -> Self {
        self.binding(BindingKind::Path, name, index, true)
    }

    /// Binds argument `index` as the query parameter `name`. Absent
    /// arguments are omitted.
    pub fn query_param(self, name: impl Into<String>, index: usize) -> Self {
        self.binding(BindingKind::Query, name, index, false)
    }

    /// Like [`query_param`](Self::query_param) for pre-encoded values.
    pub fn query_param_encoded(self, name: impl Into<String>, index: usize) -> Self {
        self.binding(BindingKind::Query, name, index, true)
    }

    /// Binds argument `index` as the request header `name`.
    pub fn header_param(self, name: impl Into<String>, index: usize) -> Self {
        self.binding(BindingKind::Header, name, index, false)
    }

    /// Binds argument `index` to the `{name}` host template token.
    pub fn host_param(self, name: impl Into<String>, index: usize) -> Self {
        self.binding(BindingKind::Host, name, index, false)
    }

    /// Adds a constant header to every request of this method.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_literals.push(HeaderLiteral {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Binds argument `index` as the request body.
    pub fn body(mut self, index: usize) -> Self {
        self.bodies.push(BodyBinding {
            index,
            content_type: None,
        });
        self
    }

    /// Binds argument `index` as the body with a declared content type.
    pub fn body_with_content_type(
        mut self,
        index: usize,
        content_type: impl Into<String>,
    ) -> Self {
        self.bodies.push(BodyBinding {
            index,
            content_type: Some(content_type.into()),
        });
        self
    }

    /// Declares the statuses that do not raise an unexpected-status
    /// error. Without this, `{200, 201, 202, 204}` is assumed.
    pub fn expect_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.expected_statuses = Some(statuses.into_iter().collect());
        self
    }

    /// Declares the error kind instantiated on unexpected statuses.
    pub fn error_kind(mut self, kind: impl Into<String>) -> Self {
        self.error_kind = Some(kind.into());
        self
    }

    /// Declares the wire format of the result entity.
    pub fn wire_format(mut self, wire: WireFormat) -> Self {
        self.wire = Some(wire);
        self
    }

    /// Declares the result entity shape.
    pub fn returns(mut self, shape: EntityShape) -> Self {
        self.result = ResultShape::Entity(shape);
        self
    }

    /// Declares a status+headers+body envelope result. `typed_headers`
    /// says whether the caller deserializes a headers struct.
    pub fn returns_response(mut self, typed_headers: bool, body: EntityShape) -> Self {
        self.result = ResultShape::WithResponse {
            typed_headers,
            body,
        };
        self
    }

    /// Declares a lazy-sequence result over `element`.
    ///
    /// Only byte elements are supported; any other element shape is
    /// rejected when the spec is bound.
    pub fn returns_sequence(mut self, element: EntityShape) -> Self {
        if element == EntityShape::Bytes {
            self.result = ResultShape::Entity(EntityShape::ByteChunks);
        } else {
            self.invalid_sequence = Some(element);
        }
        self
    }

    /// Declares the return shape; [`ReturnShape::Future`] is the default.
    pub fn shape(mut self, shape: ReturnShape) -> Self {
        self.shape = shape;
        self
    }
}

/// Declaration of a whole service interface.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    name: String,
    host: Option<String>,
    methods: Vec<MethodSpec>,
}

impl ServiceSpec {
    /// Declares an interface.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
            methods: Vec::new(),
        }
    }

    /// Declares the host annotation, optionally with a scheme and
    /// `{token}` substitutions: `https://{account}.example.com`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Adds a method declaration.
    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }
}

/// The frozen plan for one interface method.
///
/// Immutable once built; shared by every invocation of the method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    full_name: String,
    method: Method,
    scheme: String,
    host: String,
    path: String,
    bindings: Vec<ParamBinding>,
    header_literals: Vec<HeaderLiteral>,
    body: Option<BodyBinding>,
    expected_statuses: BTreeSet<u16>,
    error_kind: String,
    wire: Option<WireFormat>,
    result: ResultShape,
    shape: ReturnShape,
}

/// Statuses assumed expected when a method declares none.
const DEFAULT_EXPECTED_STATUSES: [u16; 4] = [200, 201, 202, 204];

/// Default error kind for methods that declare none.
const DEFAULT_ERROR_KIND: &str = "RestError";

impl MethodDescriptor {
    /// Fully-qualified method name (`Service.method`).
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The HTTP verb.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URL scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host template.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn bindings(&self) -> &[ParamBinding] {
        &self.bindings
    }

    pub(crate) fn header_literals(&self) -> &[HeaderLiteral] {
        &self.header_literals
    }

    pub(crate) fn body_binding(&self) -> Option<&BodyBinding> {
        self.body.as_ref()
    }

    /// The declared error kind.
    pub fn error_kind(&self) -> &str {
        &self.error_kind
    }

    /// The wire format of the result entity, when one is declared.
    pub fn wire_format(&self) -> Option<WireFormat> {
        self.wire
    }

    /// The result shape tree.
    pub fn result_shape(&self) -> &ResultShape {
        &self.result
    }

    /// The declared return shape.
    pub fn return_shape(&self) -> ReturnShape {
        self.shape
    }

    /// Whether `status` is expected, given extra codes permitted by the
    /// invocation context.
    pub fn is_expected_status(&self, status: u16, additional: &[u16]) -> bool {
        self.expected_statuses.contains(&status) || additional.contains(&status)
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedInterface {
            method: self.full_name.clone(),
            reason: reason.into(),
        }
    }
}

/// Scans a template for `{name}` placeholders.
fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let tail = &rest[open + 1..];
        match tail.find('}') {
            Some(close) => {
                found.push(&tail[..close]);
                rest = &tail[close + 1..];
            }
            None => break,
        }
    }
    found
}

fn build_descriptor(
    service: &ServiceSpec,
    base_url: Option<&str>,
    spec: &MethodSpec,
) -> Result<MethodDescriptor> {
    let full_name = format!("{}.{}", service.name, spec.name);
    let malformed = |reason: String| Error::MalformedInterface {
        method: full_name.clone(),
        reason,
    };

    if let Some(element) = &spec.invalid_sequence {
        return Err(Error::UnsupportedReturnType {
            method: full_name.clone(),
            reason: format!(
                "lazy sequences of non-byte elements ({element:?}) cannot be produced"
            ),
        });
    }

    let host_annotation = base_url
        .map(str::to_string)
        .or_else(|| service.host.clone())
        .ok_or_else(|| malformed("no host declared and no base URL provided".to_string()))?;
    let (scheme, host) = match host_annotation.split_once("://") {
        Some((scheme, host)) => (scheme.to_string(), host.trim_end_matches('/').to_string()),
        None => ("https".to_string(), host_annotation.trim_end_matches('/').to_string()),
    };

    for placeholder in placeholders(&spec.path) {
        let count = spec
            .bindings
            .iter()
            .filter(|b| b.kind == BindingKind::Path && b.name == placeholder)
            .count();
        match count {
            1 => {}
            0 => {
                return Err(malformed(format!(
                    "path placeholder {{{placeholder}}} has no PATH binding"
                )))
            }
            _ => {
                return Err(malformed(format!(
                    "path placeholder {{{placeholder}}} has {count} PATH bindings"
                )))
            }
        }
    }
    let host_tokens = placeholders(&host);
    for binding in &spec.bindings {
        match binding.kind {
            BindingKind::Path => {
                if !placeholders(&spec.path).contains(&binding.name.as_str()) {
                    return Err(malformed(format!(
                        "PATH binding '{}' matches no path placeholder",
                        binding.name
                    )));
                }
            }
            BindingKind::Host => {
                if !host_tokens.contains(&binding.name.as_str()) {
                    return Err(malformed(format!(
                        "HOST binding '{}' matches no host token",
                        binding.name
                    )));
                }
            }
            BindingKind::Query | BindingKind::Header => {}
        }
    }
    for token in &host_tokens {
        if !spec
            .bindings
            .iter()
            .any(|b| b.kind == BindingKind::Host && b.name == *token)
        {
            return Err(malformed(format!(
                "host token {{{token}}} has no HOST binding"
            )));
        }
    }

    if spec.bodies.len() > 1 {
        return Err(malformed(format!(
            "{} BODY bindings declared, at most one is allowed",
            spec.bodies.len()
        )));
    }

    let expected_statuses: BTreeSet<u16> = match &spec.expected_statuses {
        Some(declared) if declared.is_empty() => {
            return Err(malformed("expected-status set is empty".to_string()))
        }
        Some(declared) => declared.iter().copied().collect(),
        None => DEFAULT_EXPECTED_STATUSES.into_iter().collect(),
    };

    Ok(MethodDescriptor {
        full_name,
        method: spec.method.clone(),
        scheme,
        host,
        path: spec.path.clone(),
        bindings: spec.bindings.clone(),
        header_literals: spec.header_literals.clone(),
        body: spec.bodies.first().cloned(),
        expected_statuses,
        error_kind: spec
            .error_kind
            .clone()
            .unwrap_or_else(|| DEFAULT_ERROR_KIND.to_string()),
        wire: spec.wire,
        result: spec.result.clone(),
        shape: spec.shape,
    })
}

/// A validated service binding: the declarations plus the per-method
/// descriptor cache.
///
/// Every declaration is checked when the interface is bound, so
/// parse-time errors surface synchronously; descriptor instances are then
/// built on first lookup and cached. The cache is read-mostly — a racing
/// double build inserts twice and the last write wins.
#[derive(Debug)]
pub struct ServiceInterface {
    spec: ServiceSpec,
    base_url: Option<String>,
    cache: RwLock<HashMap<String, Arc<MethodDescriptor>>>,
}

impl ServiceInterface {
    /// Validates the spec and binds it, optionally overriding the
    /// declared host with `base_url`.
    pub fn bind(spec: ServiceSpec, base_url: Option<String>) -> Result<Self> {
        for method in &spec.methods {
            build_descriptor(&spec, base_url.as_deref(), method)?;
        }
        Ok(Self {
            spec,
            base_url,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// The interface name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Returns the descriptor for `method`, building and caching it on
    /// first lookup.
    pub fn descriptor(&self, method: &str) -> Result<Arc<MethodDescriptor>> {
        if let Some(descriptor) = self.cache.read().unwrap().get(method) {
            return Ok(descriptor.clone());
        }
        let spec = self
            .spec
            .methods
            .iter()
            .find(|m| m.name == method)
            .ok_or_else(|| Error::MalformedInterface {
                method: format!("{}.{}", self.spec.name, method),
                reason: "method is not declared on the interface".to_string(),
            })?;
        let descriptor = Arc::new(build_descriptor(&self.spec, self.base_url.as_deref(), spec)?);
        self.cache
            .write()
            .unwrap()
            .insert(method.to_string(), descriptor.clone());
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_service() -> ServiceSpec {
        ServiceSpec::new("ItemService").host("https://api.example.com").method(
            MethodSpec::get("getItem", "/items/{id}")
                .path_param("id", 0)
                .query_param("verbose", 1)
                .returns(EntityShape::Json),
        )
    }

    #[test]
    fn test_descriptor_builds_are_deterministic() {
        let a = ServiceInterface::bind(item_service(), None).unwrap();
        let b = ServiceInterface::bind(item_service(), None).unwrap();
        assert_eq!(
            *a.descriptor("getItem").unwrap(),
            *b.descriptor("getItem").unwrap()
        );
    }

    #[test]
    fn test_descriptor_is_cached() {
        let interface = ServiceInterface::bind(item_service(), None).unwrap();
        let first = interface.descriptor("getItem").unwrap();
        let second = interface.descriptor("getItem").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_default_expected_statuses() {
        let interface = ServiceInterface::bind(item_service(), None).unwrap();
        let descriptor = interface.descriptor("getItem").unwrap();
        for status in [200, 201, 202, 204] {
            assert!(descriptor.is_expected_status(status, &[]));
        }
        assert!(!descriptor.is_expected_status(404, &[]));
        assert!(descriptor.is_expected_status(404, &[404]));
    }

    #[test]
    fn test_unresolved_placeholder_is_malformed() {
        let spec = ServiceSpec::new("S")
            .host("https://h")
            .method(MethodSpec::get("get", "/items/{id}"));
        let err = ServiceInterface::bind(spec, None).unwrap_err();
        assert!(matches!(err, Error::MalformedInterface { .. }), "{err}");
    }

    #[test]
    fn test_duplicate_path_binding_is_malformed() {
        let spec = ServiceSpec::new("S").host("https://h").method(
            MethodSpec::get("get", "/items/{id}")
                .path_param("id", 0)
                .path_param("id", 1),
        );
        assert!(matches!(
            ServiceInterface::bind(spec, None),
            Err(Error::MalformedInterface { .. })
        ));
    }

    #[test]
    fn test_duplicate_body_is_malformed() {
        let spec = ServiceSpec::new("S")
            .host("https://h")
            .method(MethodSpec::post("create", "/items").body(0).body(1));
        assert!(matches!(
            ServiceInterface::bind(spec, None),
            Err(Error::MalformedInterface { .. })
        ));
    }

    #[test]
    fn test_empty_expected_statuses_is_malformed() {
        let spec = ServiceSpec::new("S")
            .host("https://h")
            .method(MethodSpec::get("get", "/items").expect_statuses([]));
        assert!(matches!(
            ServiceInterface::bind(spec, None),
            Err(Error::MalformedInterface { .. })
        ));
    }

    #[test]
    fn test_non_byte_sequence_is_unsupported() {
        let spec = ServiceSpec::new("S")
            .host("https://h")
            .method(MethodSpec::get("watch", "/events").returns_sequence(EntityShape::Json));
        assert!(matches!(
            ServiceInterface::bind(spec, None),
            Err(Error::UnsupportedReturnType { .. })
        ));
    }

    #[test]
    fn test_byte_sequence_is_supported() {
        let spec = ServiceSpec::new("S")
            .host("https://h")
            .method(MethodSpec::get("download", "/blob").returns_sequence(EntityShape::Bytes));
        let interface = ServiceInterface::bind(spec, None).unwrap();
        let descriptor = interface.descriptor("download").unwrap();
        assert_eq!(
            descriptor.result_shape(),
            &ResultShape::Entity(EntityShape::ByteChunks)
        );
    }

    #[test]
    fn test_missing_host_is_malformed() {
        let spec = ServiceSpec::new("S").method(MethodSpec::get("get", "/"));
        assert!(matches!(
            ServiceInterface::bind(spec, None),
            Err(Error::MalformedInterface { .. })
        ));
    }

    #[test]
    fn test_base_url_overrides_declared_host() {
        let interface =
            ServiceInterface::bind(item_service(), Some("http://localhost:8080".to_string()))
                .unwrap();
        let descriptor = interface.descriptor("getItem").unwrap();
        assert_eq!(descriptor.scheme(), "http");
        assert_eq!(descriptor.host(), "localhost:8080");
    }

    #[test]
    fn test_host_token_requires_binding() {
        let spec = ServiceSpec::new("S")
            .host("https://{account}.example.com")
            .method(MethodSpec::get("get", "/"));
        assert!(matches!(
            ServiceInterface::bind(spec, None),
            Err(Error::MalformedInterface { .. })
        ));

        let spec = ServiceSpec::new("S")
            .host("https://{account}.example.com")
            .method(MethodSpec::get("get", "/").host_param("account", 0));
        assert!(ServiceInterface::bind(spec, None).is_ok());
    }

    #[test]
    fn test_unknown_method_lookup_fails() {
        let interface = ServiceInterface::bind(item_service(), None).unwrap();
        assert!(matches!(
            interface.descriptor("nope"),
            Err(Error::MalformedInterface { .. })
        ));
    }
}
