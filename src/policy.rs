//! Built-in request policies: user agent, cookies, credentials.
//!
//! These are the standard members of the default pipeline (in outer to
//! inner order: user agent, retry, cookies, credentials). The retry
//! policy lives in [`crate::retry`].

use crate::error::Result;
use crate::pipeline::{NextPolicy, PolicyFactory, PolicyOptions, RequestPolicy};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Sets a `User-Agent` header on requests that lack one.
pub struct UserAgentPolicyFactory {
    agent: String,
}

impl UserAgentPolicyFactory {
    /// Uses the given agent string.
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
        }
    }
}

impl Default for UserAgentPolicyFactory {
    fn default() -> Self {
        Self::new(concat!("restbind/", env!("CARGO_PKG_VERSION")))
    }
}

impl PolicyFactory for UserAgentPolicyFactory {
    fn create(&self, next: NextPolicy, _options: &PolicyOptions) -> Arc<dyn RequestPolicy> {
        Arc::new(UserAgentPolicy {
            agent: self.agent.clone(),
            next,
        })
    }
}

struct UserAgentPolicy {
    agent: String,
    next: NextPolicy,
}

#[async_trait]
impl RequestPolicy for UserAgentPolicy {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        if !request.headers().contains("User-Agent") {
            request.headers_mut().set("User-Agent", &self.agent);
        }
        self.next.send(request).await
    }
}

/// Stores cookies between requests.
///
/// The jar is the only shared mutable state touched by the engine; its
/// locking discipline is its own concern.
pub trait CookieJar: Send + Sync {
    /// The `Cookie` header value for a request to `url`, if any cookies
    /// apply.
    fn cookie_header(&self, url: &str) -> Option<String>;

    /// Records the (comma-joined) `Set-Cookie` value of a response from
    /// `url`.
    fn store(&self, url: &str, set_cookie: &str);
}

/// A host-keyed in-memory jar.
///
/// `Set-Cookie` values arrive comma-joined, so a cookie attribute that
/// itself contains a comma (an `Expires` date) confuses the split; this
/// jar keeps only the leading `name=value` of each fragment.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryCookieJar {
    /// An empty jar.
    pub fn new() -> Self {
        Self::default()
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

impl CookieJar for MemoryCookieJar {
    fn cookie_header(&self, url: &str) -> Option<String> {
        let host = host_of(url)?;
        let cookies = self.cookies.lock().unwrap();
        let for_host = cookies.get(&host)?;
        if for_host.is_empty() {
            return None;
        }
        let mut pairs: Vec<String> = for_host
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.sort();
        Some(pairs.join("; "))
    }

    fn store(&self, url: &str, set_cookie: &str) {
        let Some(host) = host_of(url) else { return };
        let mut cookies = self.cookies.lock().unwrap();
        let for_host = cookies.entry(host).or_default();
        for fragment in set_cookie.split(',') {
            let cookie_pair = fragment.split(';').next().unwrap_or("").trim();
            if let Some((name, value)) = cookie_pair.split_once('=') {
                for_host.insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }
}

/// Applies a jar's cookies to requests and records `Set-Cookie`
/// responses.
pub struct CookiePolicyFactory {
    jar: Arc<dyn CookieJar>,
}

impl CookiePolicyFactory {
    /// Uses the given jar.
    pub fn new(jar: Arc<dyn CookieJar>) -> Self {
        Self { jar }
    }
}

impl PolicyFactory for CookiePolicyFactory {
    fn create(&self, next: NextPolicy, _options: &PolicyOptions) -> Arc<dyn RequestPolicy> {
        Arc::new(CookiePolicy {
            jar: self.jar.clone(),
            next,
        })
    }
}

struct CookiePolicy {
    jar: Arc<dyn CookieJar>,
    next: NextPolicy,
}

#[async_trait]
impl RequestPolicy for CookiePolicy {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url().to_string();
        if let Some(cookie) = self.jar.cookie_header(&url) {
            request.headers_mut().set("Cookie", cookie);
        }
        let response = self.next.send(request).await?;
        if let Some(set_cookie) = response.headers().value("Set-Cookie") {
            self.jar.store(&url, set_cookie);
        }
        Ok(response)
    }
}

/// Supplies the `Authorization` header value for a request.
#[async_trait]
pub trait TokenCredentials: Send + Sync {
    /// The header value to authenticate a request to `url`.
    async fn header_value(&self, url: &str) -> Result<String>;
}

/// Static bearer-token credentials.
pub struct BearerTokenCredentials {
    token: String,
}

impl BearerTokenCredentials {
    /// Uses the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredentials for BearerTokenCredentials {
    async fn header_value(&self, _url: &str) -> Result<String> {
        Ok(format!("Bearer {}", self.token))
    }
}

/// Sets the `Authorization` header from a credentials provider. Touches
/// nothing else on the request.
pub struct CredentialsPolicyFactory {
    credentials: Arc<dyn TokenCredentials>,
}

impl CredentialsPolicyFactory {
    /// Uses the given provider.
    pub fn new(credentials: Arc<dyn TokenCredentials>) -> Self {
        Self { credentials }
    }
}

impl PolicyFactory for CredentialsPolicyFactory {
    fn create(&self, next: NextPolicy, _options: &PolicyOptions) -> Arc<dyn RequestPolicy> {
        Arc::new(CredentialsPolicy {
            credentials: self.credentials.clone(),
            next,
        })
    }
}

struct CredentialsPolicy {
    credentials: Arc<dyn TokenCredentials>,
    next: NextPolicy,
}

#[async_trait]
impl RequestPolicy for CredentialsPolicy {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let value = self.credentials.header_value(request.url()).await?;
        request.headers_mut().set("Authorization", value);
        self.next.send(request).await
    }
}
