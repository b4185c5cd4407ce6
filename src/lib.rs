//! # restbind - a declarative REST client engine
//!
//! Restbind synthesizes asynchronous HTTP service clients from declared
//! interfaces. A [`ServiceSpec`] describes each method — verb, URL
//! template, parameter bindings, expected statuses, error kind, result
//! shape — and binding it produces a [`ServiceClient`] whose invocations
//! yield typed results or typed errors after flowing through a
//! composable request-policy pipeline.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restbind::{Arg, EntityShape, MethodSpec, ServiceClient, ServiceSpec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct CreateWidget {
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct Widget {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restbind::Error> {
//!     let spec = ServiceSpec::new("WidgetService")
//!         .host("https://api.example.com")
//!         .method(
//!             MethodSpec::get("getWidget", "/widgets/{id}")
//!                 .path_param("id", 0)
//!                 .returns(EntityShape::Json),
//!         )
//!         .method(
//!             MethodSpec::post("createWidget", "/widgets")
//!                 .body(0)
//!                 .expect_statuses([201])
//!                 .returns(EntityShape::Json),
//!         );
//!
//!     let client = ServiceClient::builder().interface(spec).build()?;
//!
//!     let widget: Widget = client.invoke("getWidget", &[Arg::text("42")]).await?;
//!     println!("fetched {}", widget.name);
//!
//!     let created: Widget = client
//!         .invoke(
//!             "createWidget",
//!             &[Arg::json(&CreateWidget { name: "flux".into() })?],
//!         )
//!         .await?;
//!     println!("created widget {}", created.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## How a call flows
//!
//! 1. The method's cached [`descriptor`](MethodDescriptor) is looked up;
//!    descriptors are validated once, when the interface is bound.
//! 2. The request builder substitutes host and path bindings (encoding
//!    values unless pre-encoded), appends query pairs, assembles headers,
//!    resolves the body content type, and encodes the body.
//! 3. The [`HttpPipeline`] runs the request through its policies — user
//!    agent, retry with backoff, cookies, credentials — down to the
//!    transport.
//! 4. The response handler gates the status against the expected set,
//!    extracts the entity (including base64url and datetime wire-format
//!    remapping through nested containers), and adapts the result to the
//!    declared return shape: async future, blocking value, envelope,
//!    byte stream, or completion-only.
//!
//! ## Error Handling
//!
//! All failures are [`Error`] values. An unexpected status yields
//! [`Error::UnexpectedStatus`] carrying the declared error kind, the raw
//! body text, and the decoded error body when the codec understood it:
//!
//! ```no_run
//! use restbind::{Arg, Error, ServiceClient};
//!
//! # async fn example(client: ServiceClient) {
//! match client.invoke::<serde_json::Value>("getWidget", &[Arg::text("42")]).await {
//!     Ok(widget) => println!("{widget}"),
//!     Err(Error::UnexpectedStatus { kind, status, body, .. }) => {
//!         eprintln!("{kind} ({status}): {body:?}");
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! # }
//! ```

mod builder;
mod handler;

pub mod body;
pub mod client;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod headers;
pub mod pipeline;
pub mod policy;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
pub mod url;
pub mod wire;

pub use body::{FileSegment, RequestBody};
pub use client::{ServiceClient, ServiceClientBuilder};
pub use codec::{Codec, Encoding, JsonCodec};
pub use descriptor::{
    Arg, EntityShape, MethodDescriptor, MethodSpec, ResultShape, ReturnShape, ServiceInterface,
    ServiceSpec,
};
pub use error::{Error, Result};
pub use headers::Headers;
pub use pipeline::{HttpPipeline, NextPolicy, PolicyFactory, PolicyOptions, RequestPolicy};
pub use policy::{
    BearerTokenCredentials, CookieJar, CookiePolicyFactory, CredentialsPolicyFactory,
    MemoryCookieJar, TokenCredentials, UserAgentPolicyFactory,
};
pub use request::HttpRequest;
pub use response::{ByteChunks, HttpResponse, ResponseBody, RestResponse};
pub use retry::{AttemptOutcome, RetryDecider, RetryOnTransient, RetryPolicyFactory, RetryStrategy};
pub use transport::{ReqwestTransport, Transport};
pub use wire::{Base64Url, Rfc1123DateTime, UnixTime, WireFormat};
