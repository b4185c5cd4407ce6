//! Integration tests using wiremock to simulate HTTP servers.

use chrono::{TimeZone, Utc};
use futures::StreamExt;
use restbind::{
    Arg, BearerTokenCredentials, EntityShape, Error, HttpPipeline, MemoryCookieJar, MethodSpec,
    ReqwestTransport, RestResponse, RetryPolicyFactory, RetryStrategy, ServiceClient, ServiceSpec,
    WireFormat,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_bytes, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Item {
    id: String,
    n: u32,
}

fn bind(server: &MockServer, spec: ServiceSpec) -> ServiceClient {
    ServiceClient::builder()
        .interface(spec)
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_path_param_is_percent_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items/a%2Fb"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "a/b", "n": 1})),
        )
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("ItemService").method(
            MethodSpec::get("getItem", "/items/{id}")
                .path_param("id", 0)
                .returns(EntityShape::Json),
        ),
    );

    let item: Item = client.invoke("getItem", &[Arg::text("a/b")]).await.unwrap();
    assert_eq!(
        item,
        Item {
            id: "a/b".to_string(),
            n: 1
        }
    );
}

#[tokio::test]
async fn test_head_probe_returns_bool() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("ProbeService").method(
            MethodSpec::head("probe", "/probe").returns(EntityShape::Bool),
        ),
    );

    let exists: bool = client.invoke("probe", &[]).await.unwrap();
    assert!(exists);
}

#[tokio::test]
async fn test_head_probe_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("ProbeService").method(
            MethodSpec::head("probe", "/probe")
                .expect_statuses(200..300)
                .returns(EntityShape::Bool),
        ),
    );

    let err = client.invoke::<bool>("probe", &[]).await.unwrap_err();
    match err {
        Error::UnexpectedStatus { status, .. } => assert_eq!(status, 404),
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bytes_upload_defaults_to_octet_stream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(body_bytes(vec![0x01u8, 0x02, 0x03]))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("UploadService")
            .method(MethodSpec::post("upload", "/upload").body(0)),
    );

    client
        .invoke::<()>("upload", &[Arg::bytes(vec![0x01, 0x02, 0x03])])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_base64url_token_is_decoded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json("AQID"))
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("TokenService").method(
            MethodSpec::get("getToken", "/token")
                .returns(EntityShape::Bytes)
                .wire_format(WireFormat::Base64Url),
        ),
    );

    let token = client.invoke_bytes("getToken", &[]).await.unwrap();
    assert_eq!(&token[..], &[0x01, 0x02, 0x03]);
}

#[tokio::test]
async fn test_rfc1123_datetime_list_is_remapped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(vec!["Sun, 06 Nov 1994 08:49:37 GMT"]),
        )
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("TimeService").method(
            MethodSpec::get("list", "/list")
                .returns(EntityShape::List(Box::new(EntityShape::DateTime)))
                .wire_format(WireFormat::Rfc1123),
        ),
    );

    let stamps: Vec<chrono::DateTime<Utc>> = client.invoke("list", &[]).await.unwrap();
    assert_eq!(
        stamps,
        vec![Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap()]
    );
}

#[tokio::test]
async fn test_envelope_result_carries_status_headers_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/env"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"name": "n"}))
                .insert_header("ETag", "\"xyz\""),
        )
        .mount(&server)
        .await;

    #[derive(Debug, Deserialize)]
    struct EnvHeaders {
        etag: String,
    }
    #[derive(Debug, Deserialize, PartialEq)]
    struct EnvBody {
        name: String,
    }

    let client = bind(
        &server,
        ServiceSpec::new("EnvService").method(
            MethodSpec::get("env", "/env").returns_response(true, EntityShape::Json),
        ),
    );

    let envelope: RestResponse<EnvHeaders, EnvBody> =
        client.invoke_response("env", &[]).await.unwrap();
    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.headers.etag, "\"xyz\"");
    // The HTTP/1.1 stack lower-cases header names on receipt.
    assert_eq!(
        envelope.raw_headers.get("etag").map(String::as_str),
        Some("\"xyz\"")
    );
    assert_eq!(
        envelope.body,
        EnvBody {
            name: "n".to_string()
        }
    );
}

#[tokio::test]
async fn test_unexpected_status_carries_typed_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widget"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(serde_json::json!({"code": "conflict", "detail": "busy"})),
        )
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("WidgetService").method(
            MethodSpec::get("getWidget", "/widget")
                .error_kind("WidgetError")
                .returns(EntityShape::Json),
        ),
    );

    let err = client
        .invoke::<serde_json::Value>("getWidget", &[])
        .await
        .unwrap_err();
    match err {
        Error::UnexpectedStatus {
            kind, status, body, ..
        } => {
            assert_eq!(kind, "WidgetError");
            assert_eq!(status, 409);
            assert_eq!(
                body,
                Some(serde_json::json!({"code": "conflict", "detail": "busy"}))
            );
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_query_params_and_null_omission() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Item>::new()))
        .expect(1)
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("ItemService").method(
            MethodSpec::get("list", "/items")
                .query_param("page", 0)
                .query_param("filter", 1)
                .returns(EntityShape::Json),
        ),
    );

    let items: Vec<Item> = client
        .invoke("list", &[Arg::text("2"), Arg::None])
        .await
        .unwrap();
    assert!(items.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query().unwrap_or("").contains("filter"));
}

#[tokio::test]
async fn test_retry_recovers_from_5xx() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(move |_req: &wiremock::Request| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(500).set_body_string("try again")
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x", "n": 9}))
            }
        })
        .mount(&server)
        .await;

    let pipeline = HttpPipeline::builder()
        .policy(Arc::new(RetryPolicyFactory::new(RetryStrategy::Linear {
            delay: Duration::from_millis(10),
            max_retries: 3,
        })))
        .build(Arc::new(ReqwestTransport::new().unwrap()));

    let client = ServiceClient::builder()
        .interface(ServiceSpec::new("FlakyService").method(
            MethodSpec::get("get", "/flaky").returns(EntityShape::Json),
        ))
        .base_url(server.uri())
        .unwrap()
        .pipeline(pipeline)
        .build()
        .unwrap();

    let item: Item = client.invoke("get", &[]).await.unwrap();
    assert_eq!(item.n, 9);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_exhausted_surfaces_last_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({"s": "down"})))
        .mount(&server)
        .await;

    let pipeline = HttpPipeline::builder()
        .policy(Arc::new(RetryPolicyFactory::new(RetryStrategy::Linear {
            delay: Duration::from_millis(5),
            max_retries: 2,
        })))
        .build(Arc::new(ReqwestTransport::new().unwrap()));

    let client = ServiceClient::builder()
        .interface(ServiceSpec::new("DownService").method(
            MethodSpec::get("get", "/down").returns(EntityShape::Json),
        ))
        .base_url(server.uri())
        .unwrap()
        .pipeline(pipeline)
        .build()
        .unwrap();

    let err = client
        .invoke::<serde_json::Value>("get", &[])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));

    // Initial attempt plus two retries.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_default_pipeline_sets_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header("User-Agent", "widgets/2.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServiceClient::builder()
        .interface(ServiceSpec::new("S").method(MethodSpec::get("get", "/ua")))
        .base_url(server.uri())
        .unwrap()
        .user_agent("widgets/2.0")
        .build()
        .unwrap();

    client.invoke::<()>("get", &[]).await.unwrap();
}

#[tokio::test]
async fn test_credentials_policy_sets_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("Authorization", "Bearer sekrit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServiceClient::builder()
        .interface(ServiceSpec::new("S").method(MethodSpec::get("get", "/secure")))
        .base_url(server.uri())
        .unwrap()
        .credentials(Arc::new(BearerTokenCredentials::new("sekrit")))
        .build()
        .unwrap();

    client.invoke::<()>("get", &[]).await.unwrap();
}

#[tokio::test]
async fn test_cookie_policy_round_trips_cookies() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "session=abc; Path=/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServiceClient::builder()
        .interface(
            ServiceSpec::new("S")
                .method(MethodSpec::get("login", "/login"))
                .method(MethodSpec::get("me", "/me")),
        )
        .base_url(server.uri())
        .unwrap()
        .cookie_jar(Arc::new(MemoryCookieJar::new()))
        .build()
        .unwrap();

    client.invoke::<()>("login", &[]).await.unwrap();
    client.invoke::<()>("me", &[]).await.unwrap();
}

#[tokio::test]
async fn test_patch_sent_natively_by_default_transport() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("S").method(MethodSpec::patch("update", "/items/1").body(0)),
    );

    client
        .invoke::<()>("update", &[Arg::json(&serde_json::json!({"n": 1})).unwrap()])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_file_segment_body_sends_byte_range() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/blob"))
        .and(body_bytes(b"23456".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"0123456789").unwrap();

    let client = bind(
        &server,
        ServiceSpec::new("BlobService").method(
            MethodSpec::put("uploadRange", "/blob")
                .body_with_content_type(0, "application/octet-stream"),
        ),
    );

    client
        .invoke::<()>(
            "uploadRange",
            &[Arg::file(restbind::FileSegment::new(file.path(), 2, 5))],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stream_and_chunk_entities() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .mount(&server)
        .await;

    let client = bind(
        &server,
        ServiceSpec::new("BlobService")
            .method(MethodSpec::get("open", "/blob").returns(EntityShape::ByteStream))
            .method(MethodSpec::get("chunks", "/blob").returns_sequence(EntityShape::Bytes)),
    );

    let mut reader = client.invoke_stream("open", &[]).await.unwrap();
    let mut data = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut data)
        .await
        .unwrap();
    assert_eq!(data, b"payload");

    let chunks: Vec<_> = client
        .invoke_chunks("chunks", &[])
        .await
        .unwrap()
        .map(|c| c.unwrap())
        .collect()
        .await;
    assert_eq!(chunks.len(), 1);
    assert_eq!(&chunks[0][..], b"payload");
}

#[tokio::test]
async fn test_header_literal_and_binding_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/h"))
        .and(header("Accept", "application/json"))
        .and(header("X-Trace-Id", "t-1"))
        .and(header_exists("User-Agent"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServiceClient::builder()
        .interface(ServiceSpec::new("S").method(
            MethodSpec::get("get", "/h")
                .header("Accept", "application/json")
                .header_param("X-Trace-Id", 0),
        ))
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap();

    client.invoke::<()>("get", &[Arg::text("t-1")]).await.unwrap();
}
