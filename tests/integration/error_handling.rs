//! Failure paths: every error arrives through the completion, never as a panic.

use crate::integration::mock_server::{closed_port_url, execute, HangingServer, MockServerFixture};
use sdk_runtime::{Configuration, ErrorKind, RequestParams, RequestState};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_timeout_surfaces_as_timeout_error() {
    let hanging = HangingServer::start().await;
    let fixture = MockServerFixture::new().await;
    let client = fixture.pool.get(&hanging.base_url);

    let started = Instant::now();
    let params = RequestParams::get("/slow").timeout(Duration::from_millis(1));
    let (id, completion) = execute::<serde_json::Value>(&client, params).await;

    let err = completion.result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(completion.response.is_none());
    // Terminated requests are no longer tracked.
    assert!(client.task(id).is_none());
    assert_eq!(client.request_queue_size(), 0);
}

#[tokio::test]
async fn test_configured_timeout_applies_without_per_request_override() {
    let hanging = HangingServer::start().await;
    let fixture =
        MockServerFixture::with_config(Configuration::new().with_timeout(Duration::from_millis(50)))
            .await;
    let client = fixture.pool.get(&hanging.base_url);

    let (_, completion) = execute::<serde_json::Value>(&client, RequestParams::get("/slow")).await;
    assert_eq!(completion.result.unwrap_err().kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let fixture = MockServerFixture::new().await;
    let client = fixture.pool.get(&closed_port_url().await);

    let (_, completion) = execute::<serde_json::Value>(&client, RequestParams::get("/pet/1")).await;

    assert_eq!(completion.state(), RequestState::Failed);
    let err = completion.result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_malformed_json_is_decoding_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("GET", "/pet/1", 200, r#"{"id": 1,"#).await;

    let client = fixture.client();
    let (_, completion) = execute::<serde_json::Value>(&client, RequestParams::get("/pet/1")).await;

    let err = completion.result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
    assert_eq!(err.body().map(|b| b.as_ref()), Some(&br#"{"id": 1,"#[..]));
    assert_eq!(completion.response.map(|r| r.status), Some(200));
}

#[tokio::test]
async fn test_server_error_keeps_headers_and_body() {
    let fixture = MockServerFixture::new().await;
    let _mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", "/store/order/1")
            .with_status(503)
            .with_header("retry-after", "30")
            .with_body("maintenance")
            .create_async()
            .await
    };

    let client = fixture.client();
    let (_, completion) =
        execute::<serde_json::Value>(&client, RequestParams::get("/store/order/1")).await;

    match completion.result.unwrap_err() {
        sdk_runtime::Error::HttpStatus {
            status,
            body,
            headers,
        } => {
            assert_eq!(status, 503);
            assert_eq!(&body[..], b"maintenance");
            assert_eq!(
                headers.get("retry-after").and_then(|v| v.to_str().ok()),
                Some("30")
            );
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_header_value_fails_through_completion() {
    let fixture = MockServerFixture::new().await;
    let client = fixture.client();

    let params = RequestParams::get("/pet/1").header("X-Bad", "line\nbreak");
    let (id, completion) = execute::<serde_json::Value>(&client, params).await;

    assert_eq!(completion.result.unwrap_err().kind(), ErrorKind::Validation);
    assert!(client.task(id).is_none());
}

#[tokio::test]
async fn test_invalid_base_url_fails_through_completion() {
    let fixture = MockServerFixture::new().await;
    let client = fixture.pool.get("not a url");

    let (_, completion) = execute::<serde_json::Value>(&client, RequestParams::get("/pet/1")).await;

    assert_eq!(completion.result.unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(client.request_queue_size(), 0);
}
