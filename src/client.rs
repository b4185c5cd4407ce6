//! The invocation façade.
//!
//! A [`ServiceClient`] binds a declared interface to a policy pipeline
//! and a codec. Each invocation looks up the method's cached descriptor,
//! materializes a request, sends it through the pipeline, and routes the
//! response through the handler, adapting the result to the method's
//! declared return shape. The blocking adapters are the engine's only
//! blocking points; everything else is async end to end.

use crate::builder::build_request;
use crate::codec::{Codec, JsonCodec};
use crate::descriptor::{
    Arg, EntityShape, MethodDescriptor, ResultShape, ReturnShape, ServiceInterface, ServiceSpec,
};
use crate::error::{Error, Result};
use crate::handler;
use crate::pipeline::HttpPipeline;
use crate::policy::{
    CookieJar, CookiePolicyFactory, CredentialsPolicyFactory, TokenCredentials,
    UserAgentPolicyFactory,
};
use crate::response::{ByteChunks, HttpResponse, RestResponse};
use crate::retry::RetryPolicyFactory;
use crate::transport::{ReqwestTransport, Transport};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// A bound service client.
///
/// Cloning is cheap; clones share the descriptor cache, pipeline, and
/// codec, and concurrent invocations are independent.
///
/// # Examples
///
/// ```no_run
/// use restbind::{Arg, EntityShape, MethodSpec, ServiceClient, ServiceSpec};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Item {
///     id: String,
///     n: u32,
/// }
///
/// # async fn example() -> restbind::Result<()> {
/// let spec = ServiceSpec::new("ItemService")
///     .host("https://api.example.com")
///     .method(
///         MethodSpec::get("getItem", "/items/{id}")
///             .path_param("id", 0)
///             .returns(EntityShape::Json),
///     );
///
/// let client = ServiceClient::builder().interface(spec).build()?;
/// let item: Item = client.invoke("getItem", &[Arg::text("a/b")]).await?;
/// println!("item {} has {}", item.id, item.n);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient").finish_non_exhaustive()
    }
}

struct ClientInner {
    interface: ServiceInterface,
    pipeline: Arc<HttpPipeline>,
    codec: Arc<dyn Codec>,
    timeout: Option<Duration>,
}

impl ServiceClient {
    /// Creates a new builder.
    pub fn builder() -> ServiceClientBuilder {
        ServiceClientBuilder::new()
    }

    fn descriptor_for(&self, method: &str, shape: ReturnShape) -> Result<Arc<MethodDescriptor>> {
        let descriptor = self.inner.interface.descriptor(method)?;
        if descriptor.return_shape() != shape {
            return Err(Error::UnsupportedReturnType {
                method: descriptor.full_name().to_string(),
                reason: format!(
                    "method declares the {:?} return shape but was invoked as {shape:?}",
                    descriptor.return_shape()
                ),
            });
        }
        Ok(descriptor)
    }

    /// Builds the request, sends it, and gates the status.
    async fn run(&self, descriptor: &MethodDescriptor, args: &[Arg]) -> Result<HttpResponse> {
        let request = build_request(descriptor, args, self.inner.codec.as_ref())?;
        tracing::debug!(
            caller = descriptor.full_name(),
            method = %request.method(),
            url = request.url(),
            "sending request"
        );

        let send = self.inner.pipeline.send(request);
        let response = match self.inner.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| Error::Cancelled)??,
            None => send.await?,
        };

        tracing::info!(
            caller = descriptor.full_name(),
            status = response.status(),
            "received response"
        );
        handler::ensure_expected_status(descriptor, response, self.inner.codec.as_ref(), &[]).await
    }

    async fn value_result<T: DeserializeOwned>(
        &self,
        descriptor: &MethodDescriptor,
        args: &[Arg],
    ) -> Result<T> {
        let shape = match descriptor.result_shape() {
            ResultShape::Entity(shape) => shape.clone(),
            ResultShape::WithResponse { .. } => {
                return Err(Error::UnsupportedReturnType {
                    method: descriptor.full_name().to_string(),
                    reason: "envelope results are produced by invoke_response".to_string(),
                })
            }
        };
        let response = self.run(descriptor, args).await?;
        let value = handler::entity_value(descriptor, &shape, &response, self.inner.codec.as_ref())
            .await?;
        serde_json::from_value(value).map_err(|e| {
            tracing::error!(
                caller = descriptor.full_name(),
                error = %e,
                "failed to deserialize response entity"
            );
            Error::serialization("response body", e.to_string())
        })
    }

    /// Invokes a method declared with the [`ReturnShape::Future`] shape
    /// and a deserializable entity.
    pub async fn invoke<T: DeserializeOwned>(&self, method: &str, args: &[Arg]) -> Result<T> {
        let descriptor = self.descriptor_for(method, ReturnShape::Future)?;
        self.value_result(&descriptor, args).await
    }

    /// Invokes a method declared with the [`ReturnShape::Sync`] shape,
    /// blocking until the result is available.
    ///
    /// This is the engine's sole visible suspension point. Calling it
    /// from inside a current-thread async runtime would deadlock and is
    /// not supported.
    pub fn invoke_sync<T: DeserializeOwned>(&self, method: &str, args: &[Arg]) -> Result<T> {
        let descriptor = self.descriptor_for(method, ReturnShape::Sync)?;
        block_on(self.value_result(&descriptor, args))
    }

    /// Invokes a [`ReturnShape::Void`] method: blocks, discards the
    /// result.
    pub fn invoke_void(&self, method: &str, args: &[Arg]) -> Result<()> {
        let descriptor = self.descriptor_for(method, ReturnShape::Void)?;
        block_on(async {
            self.run(&descriptor, args).await?;
            Ok(())
        })
    }

    /// Invokes a [`ReturnShape::Completion`] method: the future resolves
    /// once the response is fully consumed, its body discarded.
    pub async fn invoke_completion(&self, method: &str, args: &[Arg]) -> Result<()> {
        let descriptor = self.descriptor_for(method, ReturnShape::Completion)?;
        let response = self.run(&descriptor, args).await?;
        response.body_bytes().await?;
        Ok(())
    }

    fn expect_entity(
        descriptor: &MethodDescriptor,
        expected: &EntityShape,
        accessor: &str,
    ) -> Result<()> {
        if descriptor.result_shape() != &ResultShape::Entity(expected.clone()) {
            return Err(Error::UnsupportedReturnType {
                method: descriptor.full_name().to_string(),
                reason: format!(
                    "{accessor} requires the {expected:?} entity, but the method declares {:?}",
                    descriptor.result_shape()
                ),
            });
        }
        Ok(())
    }

    /// Invokes a method whose entity is raw bytes. A declared base64url
    /// wire format is decoded before the bytes are returned.
    pub async fn invoke_bytes(&self, method: &str, args: &[Arg]) -> Result<Bytes> {
        let descriptor = self.descriptor_for(method, ReturnShape::Future)?;
        Self::expect_entity(&descriptor, &EntityShape::Bytes, "invoke_bytes")?;
        let response = self.run(&descriptor, args).await?;
        handler::entity_bytes(&descriptor, &response, self.inner.codec.as_ref()).await
    }

    /// Invokes a method whose entity is the response byte stream.
    pub async fn invoke_stream(&self, method: &str, args: &[Arg]) -> Result<Cursor<Bytes>> {
        let descriptor = self.descriptor_for(method, ReturnShape::Future)?;
        Self::expect_entity(&descriptor, &EntityShape::ByteStream, "invoke_stream")?;
        let response = self.run(&descriptor, args).await?;
        response.body_reader().await
    }

    /// Invokes a method whose entity is a lazy byte-chunk sequence.
    pub async fn invoke_chunks(&self, method: &str, args: &[Arg]) -> Result<ByteChunks> {
        let descriptor = self.descriptor_for(method, ReturnShape::Future)?;
        Self::expect_entity(&descriptor, &EntityShape::ByteChunks, "invoke_chunks")?;
        let response = self.run(&descriptor, args).await?;
        response.body_chunks().await
    }

    /// Invokes a method declared with the envelope result, yielding the
    /// status, typed headers, raw headers, and typed body together.
    ///
    /// Use `()` for `H` when the method declares no typed headers.
    pub async fn invoke_response<H, T>(
        &self,
        method: &str,
        args: &[Arg],
    ) -> Result<RestResponse<H, T>>
    where
        H: DeserializeOwned,
        T: DeserializeOwned,
    {
        let descriptor = self.descriptor_for(method, ReturnShape::Future)?;
        let (typed_headers, body_shape) = match descriptor.result_shape() {
            ResultShape::WithResponse {
                typed_headers,
                body,
            } => (*typed_headers, body.clone()),
            ResultShape::Entity(_) => {
                return Err(Error::UnsupportedReturnType {
                    method: descriptor.full_name().to_string(),
                    reason: "method does not declare the envelope result".to_string(),
                })
            }
        };

        let response = self.run(&descriptor, args).await?;
        let body_value =
            handler::entity_value(&descriptor, &body_shape, &response, self.inner.codec.as_ref())
                .await?;
        let body: T = serde_json::from_value(body_value)
            .map_err(|e| Error::serialization("response body", e.to_string()))?;

        let typed_header_value = if typed_headers {
            serde_json::to_value(response.headers())
                .map_err(|e| Error::serialization("response headers", e.to_string()))?
        } else {
            serde_json::Value::Null
        };

        RestResponse::assemble(
            response.status(),
            typed_header_value,
            response.headers().to_map(),
            body,
        )
    }
}

/// Resolves a future from synchronous code: inside a multi-thread
/// runtime via `block_in_place`, otherwise on a throw-away
/// current-thread runtime.
fn block_on<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(future)),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::transport(format!("failed to start blocking runtime: {e}")))?
            .block_on(future),
    }
}

/// Builder for configuring and binding a [`ServiceClient`].
///
/// Without an explicit pipeline the builder assembles the default one:
/// user agent, retry, cookies (when a jar is supplied), credentials
/// (when supplied), over the reqwest transport.
pub struct ServiceClientBuilder {
    spec: Option<ServiceSpec>,
    base_url: Option<String>,
    pipeline: Option<Arc<HttpPipeline>>,
    transport: Option<Arc<dyn Transport>>,
    codec: Option<Arc<dyn Codec>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    credentials: Option<Arc<dyn TokenCredentials>>,
}

impl ServiceClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            spec: None,
            base_url: None,
            pipeline: None,
            transport: None,
            codec: None,
            timeout: None,
            user_agent: None,
            cookie_jar: None,
            credentials: None,
        }
    }

    /// Sets the interface declaration to bind. Required.
    pub fn interface(mut self, spec: ServiceSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Overrides the declared host with a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInterface`] if the URL cannot be parsed.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let parsed = url::Url::parse(url.as_ref()).map_err(|e| Error::MalformedInterface {
            method: "<binding>".to_string(),
            reason: format!("invalid base URL: {e}"),
        })?;
        self.base_url = Some(parsed.to_string());
        Ok(self)
    }

    /// Uses a fully custom pipeline, replacing the default policies and
    /// transport.
    pub fn pipeline(mut self, pipeline: HttpPipeline) -> Self {
        self.pipeline = Some(Arc::new(pipeline));
        self
    }

    /// Replaces the transport beneath the default pipeline.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the default JSON codec.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Applies a deadline to every invocation; elapse surfaces as
    /// [`Error::Cancelled`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the user-agent string of the default pipeline.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Adds a cookie policy backed by `jar` to the default pipeline.
    pub fn cookie_jar(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Adds a credentials policy to the default pipeline.
    pub fn credentials(mut self, credentials: Arc<dyn TokenCredentials>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Binds the interface and builds the client.
    ///
    /// Declaration problems surface here, synchronously, as
    /// [`Error::MalformedInterface`] or [`Error::UnsupportedReturnType`].
    pub fn build(self) -> Result<ServiceClient> {
        let spec = self.spec.ok_or_else(|| Error::MalformedInterface {
            method: "<binding>".to_string(),
            reason: "no interface declaration provided".to_string(),
        })?;

        let interface = ServiceInterface::bind(spec, self.base_url)?;

        let pipeline = match self.pipeline {
            Some(pipeline) => pipeline,
            None => {
                let transport = match self.transport {
                    Some(transport) => transport,
                    None => Arc::new(ReqwestTransport::new()?),
                };
                let mut builder = HttpPipeline::builder()
                    .policy(Arc::new(match &self.user_agent {
                        Some(agent) => UserAgentPolicyFactory::new(agent),
                        None => UserAgentPolicyFactory::default(),
                    }))
                    .policy(Arc::new(RetryPolicyFactory::default()));
                if let Some(jar) = self.cookie_jar {
                    builder = builder.policy(Arc::new(CookiePolicyFactory::new(jar)));
                }
                if let Some(credentials) = self.credentials {
                    builder = builder.policy(Arc::new(CredentialsPolicyFactory::new(credentials)));
                }
                Arc::new(builder.build(transport))
            }
        };

        Ok(ServiceClient {
            inner: Arc::new(ClientInner {
                interface,
                pipeline,
                codec: self.codec.unwrap_or_else(|| Arc::new(JsonCodec)),
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ServiceClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
