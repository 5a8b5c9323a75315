//! Integration tests using wiremock to simulate HTTP servers.

use futures_util::StreamExt;
use restcall::decoder::expect_status;
use restcall::retry::{RetryAlways, RetryOnRetryable};
use restcall::{Context, Error, ResourceHandle, Response, ResponseHook, RetryStrategy, Transport};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u64,
    name: String,
}

fn test_data() -> TestData {
    TestData {
        id: 1,
        name: "Test".to_string(),
    }
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/pods/nginx/log"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let data: Option<TestData> = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .prefix(["/api/v1"])
        .resource("pods")
        .name("nginx")
        .subresource(["log"])
        .call(&Context::background(), &[])
        .await
        .unwrap();

    assert_eq!(data, Some(test_data()));
}

#[tokio::test]
async fn test_post_json_round_trip_keeps_large_integers() {
    let mock_server = MockServer::start().await;

    let request_data = TestData {
        id: u64::MAX,
        name: "New".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/widgets"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(body_json(serde_json::json!({"id": u64::MAX, "name": "New"})))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_raw(r#"{"id":18446744073709551615,"name":"New"}"#, "application/json"),
        )
        .mount(&mock_server)
        .await;

    let created: Option<TestData> = Transport::new()
        .post()
        .endpoint(mock_server.uri())
        .resource("widgets")
        .json(&request_data)
        .call(&Context::background(), &[expect_status(http::StatusCode::CREATED)])
        .await
        .unwrap();

    assert_eq!(created, Some(request_data));
}

#[tokio::test]
async fn test_query_parameters() {
    #[derive(Serialize)]
    struct ListOptions {
        #[serde(rename = "labelSelector")]
        label_selector: &'static str,
        limit: u32,
    }

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pods"))
        .and(query_param("labelSelector", "app=web"))
        .and(query_param("limit", "10"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let data: Option<TestData> = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("pods")
        .query("page", ["1"])
        .queries(&ListOptions {
            label_selector: "app=web",
            limit: 10,
        })
        .call(&Context::background(), &[])
        .await
        .unwrap();

    assert_eq!(data.map(|d| d.id), Some(1));
}

#[tokio::test]
async fn test_headers_and_default_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .and(header("user-agent", "test-agent"))
        .and(header("x-request-id", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = Transport::builder()
        .user_agent("test-agent")
        .unwrap()
        .build()
        .unwrap();

    transport
        .get()
        .endpoint(mock_server.uri())
        .suffix(["test"])
        .header("X-Request-Id", ["abc"])
        .call_nop(&Context::background(), &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_no_content_skips_decoding() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/widgets/7"))
        .respond_with(ResponseTemplate::new(204).set_body_string("ignored"))
        .mount(&mock_server)
        .await;

    let deleted: Option<TestData> = Transport::new()
        .delete()
        .endpoint(mock_server.uri())
        .resource("widgets")
        .name("7")
        .call(&Context::background(), &[])
        .await
        .unwrap();

    assert_eq!(deleted, None);
}

#[tokio::test]
async fn test_wrong_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"id":1,"name":"x"}"#, "text/plain"))
        .mount(&mock_server)
        .await;

    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .call::<TestData>(&Context::background(), &[])
        .await;

    match result {
        Err(Error::UnsupportedContentType(media)) => assert_eq!(media, "text/plain"),
        other => panic!("Expected UnsupportedContentType, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("invalid json", "application/json"))
        .mount(&mock_server)
        .await;

    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .call::<TestData>(&Context::background(), &[])
        .await;

    match result {
        Err(Error::DeserializationFailed {
            raw_response,
            serde_error,
            status,
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
            assert!(serde_error.contains("expected"));
        }
        other => panic!("Expected DeserializationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upstream_error_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": "InvalidArgument",
            "message": "name is required",
            "result": null,
        })))
        .mount(&mock_server)
        .await;

    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .call::<TestData>(&Context::background(), &[])
        .await;

    match result {
        Err(Error::Upstream {
            status,
            code,
            message,
            ..
        }) => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(code, "InvalidArgument");
            assert_eq!(message, "name is required");
        }
        other => panic!("Expected Upstream, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_4xx() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .call_nop(&Context::background(), &[])
        .await;

    match result {
        Err(Error::HttpError {
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(raw_response, "Not found");
        }
        other => panic!("Expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_json_error_without_envelope_keeps_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "widget 42 not found"})),
        )
        .mount(&mock_server)
        .await;

    let err = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("widgets")
        .name("42")
        .call::<TestData>(&Context::background(), &[])
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(err.raw_response(), Some(r#"{"error":"widget 42 not found"}"#));
}

#[tokio::test]
async fn test_custom_hook_rejects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .mount(&mock_server)
        .await;

    let require_etag: ResponseHook = Arc::new(|response: &Response| match response.header("etag") {
        Some(_) => Ok(()),
        None => Err(Error::Rejected("missing etag".to_string())),
    });

    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .call::<TestData>(&Context::background(), &[expect_status(http::StatusCode::OK), require_etag])
        .await;

    assert!(matches!(result, Err(Error::Rejected(ref m)) if m == "missing etag"));
}

#[tokio::test]
async fn test_retry_on_5xx() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two requests fail with 500, third succeeds
    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(500).set_body_string("Server error")
            } else {
                ResponseTemplate::new(200).set_body_json(test_data())
            }
        })
        .mount(&mock_server)
        .await;

    let data: Option<TestData> = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .retry(
            RetryStrategy::Linear {
                delay: Duration::from_millis(10),
                max_retries: 3,
            },
            RetryOnRetryable,
        )
        .call(&Context::background(), &[])
        .await
        .unwrap();

    assert_eq!(data, Some(test_data()));
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_attempts_returns_last_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(503).set_body_string("still down"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .retry_attempts(3, Duration::from_millis(5), RetryAlways)
        .call_nop(&Context::background(), &[])
        .await;

    match result {
        Err(Error::HttpError { status, .. }) => assert_eq!(status.as_u16(), 503),
        other => panic!("Expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_custom_retry_predicate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Only 503 is worth retrying, so a 500 stops after the first attempt
    let retry_on_503 = |outcome: &restcall::Result<reqwest::Response>| {
        matches!(outcome, Ok(response) if response.status().as_u16() == 503)
    };

    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .retry(
            RetryStrategy::Linear {
                delay: Duration::from_millis(10),
                max_retries: 3,
            },
            retry_on_503,
        )
        .call_nop(&Context::background(), &[])
        .await;

    match result {
        Err(Error::HttpError { status, .. }) => assert_eq!(status.as_u16(), 500),
        other => panic!("Expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_during_retry_delay() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let token = CancellationToken::new();
    let ctx = Context::with_cancellation(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = std::time::Instant::now();
    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("test")
        .retry(
            RetryStrategy::Linear {
                delay: Duration::from_secs(30),
                max_retries: 5,
            },
            RetryOnRetryable,
        )
        .call_nop(&ctx, &[])
        .await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(Error::Canceled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_context_deadline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let ctx = Context::background().with_timeout(Duration::from_millis(100));
    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("slow")
        .call_nop(&ctx, &[])
        .await;

    assert!(matches!(result, Err(Error::Timeout)));
}

#[tokio::test]
async fn test_bytes_ignores_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(500).set_body_bytes(vec![0u8, 159, 146, 150]))
        .mount(&mock_server)
        .await;

    let body = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("raw")
        .bytes(&Context::background())
        .await
        .unwrap();

    assert_eq!(body.as_ref(), &[0u8, 159, 146, 150]);
}

#[tokio::test]
async fn test_stream_response() {
    let mock_server = MockServer::start().await;
    let payload = "line\n".repeat(1000);

    Mock::given(method("GET"))
        .and(path("/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(payload.clone()))
        .mount(&mock_server)
        .await;

    let stream = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("logs")
        .stream(&Context::background())
        .await
        .unwrap();

    assert_eq!(stream.status().as_u16(), 200);
    assert_eq!(stream.attempts(), 1);

    let mut collected = Vec::new();
    let mut chunks = Box::pin(stream.into_stream());
    while let Some(chunk) = chunks.next().await {
        collected.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(collected, payload.as_bytes());
}

#[tokio::test]
async fn test_streaming_request_body_is_replayed() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("PUT"))
        .and(path("/upload"))
        .respond_with(move |req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            assert_eq!(req.body, b"streamed payload");
            if count == 0 {
                ResponseTemplate::new(502)
            } else {
                ResponseTemplate::new(200)
            }
        })
        .mount(&mock_server)
        .await;

    Transport::new()
        .put()
        .endpoint(mock_server.uri())
        .resource("upload")
        .body_reader(std::io::Cursor::new(b"streamed payload".to_vec()))
        .retry_attempts(2, Duration::ZERO, RetryOnRetryable)
        .call_nop(&Context::background(), &[])
        .await
        .unwrap();

    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_config_errors_skip_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = Transport::new()
        .get()
        .endpoint(mock_server.uri())
        .resource("..")
        .resource("widgets")
        .name("a/b%c")
        .call_nop(&Context::background(), &[])
        .await;

    match result {
        Err(Error::Configuration(errors)) => {
            assert_eq!(errors.len(), 2);
            let message = errors.to_string();
            assert!(message.contains("may not be '..'"));
            assert!(message.contains("may not contain '/'"));
            assert!(message.contains("may not contain '%'"));
        }
        other => panic!("Expected Configuration, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resource_handle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/widgets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let widgets = ResourceHandle::new(format!("{}/v1", mock_server.uri()), "widgets")
        .to_transport(Transport::new());

    let data: Option<TestData> = widgets
        .patch()
        .name("42")
        .json(&serde_json::json!({"name": "Test"}))
        .call(&Context::background(), &[])
        .await
        .unwrap();

    assert_eq!(data, Some(test_data()));
}

#[tokio::test]
async fn test_concurrent_calls_share_transport() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(8)
        .mount(&mock_server)
        .await;

    let transport = Transport::new();
    let uri = mock_server.uri();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let transport = transport.clone();
            let uri = uri.clone();
            tokio::spawn(async move {
                transport
                    .get()
                    .endpoint(uri)
                    .resource("test")
                    .call::<TestData>(&Context::background(), &[])
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), Some(test_data()));
    }
}
