//! The request-policy pipeline.
//!
//! A pipeline is an ordered list of policy factories over a terminal
//! transport. Each `send` builds a fresh policy chain — factories are
//! applied last-to-first so the first factory's policy is outermost and
//! sees the request before any other. A policy forwards to its inner
//! neighbor (possibly after mutating the request), or short-circuits
//! with its own response or failure.

use crate::error::Result;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::transport::Transport;
use async_trait::async_trait;
use http::Method;
use std::sync::Arc;

/// Per-pipeline options handed to each factory when its policy is
/// created.
#[derive(Debug, Clone, Default)]
pub struct PolicyOptions {}

/// One node of a policy chain.
#[async_trait]
pub trait RequestPolicy: Send + Sync {
    /// Processes the request, usually by forwarding to the inner policy.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Handle to the next-inner policy of a chain.
#[derive(Clone)]
pub struct NextPolicy {
    inner: Arc<dyn RequestPolicy>,
}

impl NextPolicy {
    /// Forwards the request to the inner policy.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.inner.send(request).await
    }
}

/// Creates per-call policy instances.
pub trait PolicyFactory: Send + Sync {
    /// Creates a policy that forwards to `next`.
    fn create(&self, next: NextPolicy, options: &PolicyOptions) -> Arc<dyn RequestPolicy>;
}

/// The innermost chain node: hands the request to the transport,
/// rewriting PATCH for transports without native support.
struct TransportPolicy {
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl RequestPolicy for TransportPolicy {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        if request.method() == Method::PATCH && !self.transport.supports_patch() {
            *request.method_mut() = Method::POST;
            request
                .headers_mut()
                .set("X-HTTP-Method-Override", "PATCH");
        }
        self.transport.send(request).await
    }
}

/// An ordered policy stack terminated by a transport.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use restbind::{HttpPipeline, ReqwestTransport, RetryPolicyFactory, UserAgentPolicyFactory};
///
/// # fn example() -> restbind::Result<()> {
/// let pipeline = HttpPipeline::builder()
///     .policy(Arc::new(UserAgentPolicyFactory::default()))
///     .policy(Arc::new(RetryPolicyFactory::default()))
///     .build(Arc::new(ReqwestTransport::new()?));
/// # let _ = pipeline;
/// # Ok(())
/// # }
/// ```
pub struct HttpPipeline {
    factories: Vec<Arc<dyn PolicyFactory>>,
    transport: Arc<dyn Transport>,
    options: PolicyOptions,
}

impl HttpPipeline {
    /// Starts an empty pipeline builder.
    pub fn builder() -> HttpPipelineBuilder {
        HttpPipelineBuilder::default()
    }

    /// A pipeline with no policies, straight to the transport.
    pub fn bare(transport: Arc<dyn Transport>) -> Self {
        Self::builder().build(transport)
    }

    /// Sends a request through a freshly built policy chain.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut policy: Arc<dyn RequestPolicy> = Arc::new(TransportPolicy {
            transport: self.transport.clone(),
        });
        for factory in self.factories.iter().rev() {
            policy = factory.create(NextPolicy { inner: policy }, &self.options);
        }
        policy.send(request).await
    }
}

/// Builder collecting policy factories in outer-to-inner order.
#[derive(Default)]
pub struct HttpPipelineBuilder {
    factories: Vec<Arc<dyn PolicyFactory>>,
}

impl HttpPipelineBuilder {
    /// Appends a factory. The first appended factory produces the
    /// outermost policy.
    pub fn policy(mut self, factory: Arc<dyn PolicyFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Terminates the pipeline with a transport.
    pub fn build(self, transport: Arc<dyn Transport>) -> HttpPipeline {
        HttpPipeline {
            factories: self.factories,
            transport,
            options: PolicyOptions::default(),
        }
    }
}
