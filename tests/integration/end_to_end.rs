//! Happy-path and status handling through the full executor pipeline.

use crate::integration::mock_server::{execute, MockServerFixture};
use mockito::Matcher;
use sdk_runtime::auth::{ApiKeyAuth, AuthRegistry};
use sdk_runtime::codec::TextDecoder;
use sdk_runtime::{
    ApiClient, CollectionFormat, Error, ErrorKind, RawResponse, RequestParams, RequestState,
    RequestSummary,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Deserialize, PartialEq)]
struct Pet {
    id: u64,
    name: String,
}

#[tokio::test]
async fn test_get_json_success() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", "/pet/1")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":1,"name":"rex"}"#)
            .create_async()
            .await
    };

    let client = fixture.client();
    let params = RequestParams::get("/pet/1").accepts(["application/xml", "application/json"]);
    let (id, completion) = execute::<Pet>(&client, params).await;

    mock.assert_async().await;
    assert_eq!(completion.request_id, id);
    assert_eq!(completion.state(), RequestState::Completed);
    assert_eq!(completion.response.as_ref().map(|r| r.status), Some(200));
    assert_eq!(
        completion.result.unwrap(),
        Pet {
            id: 1,
            name: "rex".into()
        }
    );
    assert_eq!(client.request_queue_size(), 0);
    assert!(client.task(id).is_none());
}

#[tokio::test]
async fn test_not_found_is_status_error_not_transport() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_error("GET", "/pet/404", 404, "Pet not found").await;

    let client = fixture.client();
    let (_id, completion) = execute::<Pet>(&client, RequestParams::get("/pet/404")).await;

    assert_eq!(completion.state(), RequestState::Failed);
    let err = completion.result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert_ne!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.body().map(|b| b.as_ref()), Some(&b"Pet not found"[..]));
    // The raw response is still handed back for diagnostics.
    assert_eq!(completion.response.map(|r| r.status), Some(404));
}

#[tokio::test]
async fn test_post_json_body_with_auth_last_writer_wins() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/pet")
            .match_header("content-type", "application/json")
            .match_header("x-key", "second")
            .match_body(Matcher::Json(json!({"id": 2, "name": "tom"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":2,"name":"tom"}"#)
            .create_async()
            .await
    };

    let client = fixture.client();
    client.set_auth_registry(
        AuthRegistry::new()
            .with("api_key", ApiKeyAuth::header("X-Key", "first"))
            .with("api_key_override", ApiKeyAuth::header("X-Key", "second")),
    );

    let params = RequestParams::post("/pet")
        .content_types(["application/json"])
        .json_body(json!({"id": 2, "name": "tom"}))
        .auth("api_key")
        .auth("missing_scheme")
        .auth("api_key_override");
    let (_id, completion) = execute::<Pet>(&client, params).await;

    mock.assert_async().await;
    assert_eq!(completion.result.unwrap().name, "tom");
}

#[tokio::test]
async fn test_query_auth_and_collection_formats_reach_server() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", "/pet/findByStatus")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api_key".into(), "secret".into()),
                Matcher::UrlEncoded("status".into(), "available,sold".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await
    };

    let client = fixture.client();
    client.register_auth("api_key", ApiKeyAuth::query("api_key", "secret"));
    let params = RequestParams::get("/pet/findByStatus")
        .query_list("status", ["available", "sold"], CollectionFormat::Csv)
        .auth("api_key");
    let (_id, completion) = execute::<Vec<Pet>>(&client, params).await;

    mock.assert_async().await;
    assert!(completion.result.unwrap().is_empty());
}

#[tokio::test]
async fn test_explicit_accept_reaches_server_unchanged() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", "/pet/1")
            .match_header("accept", "text/xml")
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body("<pet><id>1</id></pet>")
            .create_async()
            .await
    };

    let client = fixture.client();
    let params = RequestParams::get("/pet/1")
        .header("Accept", "text/xml")
        .accepts(["application/json"]);

    let (tx, rx) = tokio::sync::oneshot::channel();
    client.execute_with_decoder(params, TextDecoder, move |c| {
        let _ = tx.send(c.result);
    });
    let body = rx.await.unwrap().unwrap();

    mock.assert_async().await;
    assert_eq!(body, "<pet><id>1</id></pet>");
}

#[tokio::test]
async fn test_default_headers_are_sent() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("DELETE", "/pet/3")
            .match_header("x-tenant", "acme")
            .with_status(204)
            .create_async()
            .await
    };

    let client = fixture.client();
    client.set_default_header("X-Tenant", "acme");
    let (_id, response) = client.execute_future::<()>(RequestParams::delete("/pet/3"));
    response.await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_logging_filter_observes_every_request() {
    let fixture = MockServerFixture::new().await;
    let _ok = fixture.mock_json("GET", "/store/inventory", 200, r#"{"sold":1}"#).await;
    let _missing = fixture.mock_error("GET", "/store/order/9", 404, "no order").await;

    let seen = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));
    {
        let seen = seen.clone();
        let failures = failures.clone();
        fixture.pool.set_logging_enabled(true);
        fixture.pool.set_logging_filter(
            move |_client: &ApiClient,
                  request: &RequestSummary,
                  response: Option<&RawResponse>,
                  error: Option<&Error>| {
                // Panics here would be swallowed, so record instead of asserting.
                if error.is_some() && response.map(|r| r.status) == Some(404) {
                    failures.fetch_add(1, Ordering::SeqCst);
                }
                if request.url.starts_with("http://") {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                false
            },
        );
    }

    let client = fixture.client();
    let (_, ok) = execute::<serde_json::Value>(&client, RequestParams::get("/store/inventory")).await;
    let (_, missing) = execute::<serde_json::Value>(&client, RequestParams::get("/store/order/9")).await;

    assert_eq!(ok.result.unwrap()["sold"], 1);
    assert_eq!(missing.result.unwrap_err().status(), Some(404));
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_logging_filter_does_not_change_outcome() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("GET", "/user/alice", 200, r#"{"id":5,"name":"alice"}"#).await;

    fixture.pool.set_logging_enabled(true);
    fixture.pool.set_logging_filter(
        |_: &ApiClient, _: &RequestSummary, _: Option<&RawResponse>, _: Option<&Error>| -> bool {
            panic!("filter bug")
        },
    );

    let client = fixture.client();
    let (_, completion) = execute::<Pet>(&client, RequestParams::get("/user/alice")).await;
    assert_eq!(completion.result.unwrap().name, "alice");
    assert_eq!(client.request_queue_size(), 0);
}
