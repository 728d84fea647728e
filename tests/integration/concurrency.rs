//! Many requests in flight on one shared client.

use crate::integration::mock_server::{HangingServer, MockServerFixture};
use sdk_runtime::{RequestId, RequestParams, RequestState};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_each_complete_once() {
    const REQUESTS: usize = 50;

    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("GET", "/pet/7", 200, r#"{"id":7}"#).await;

    let client = fixture.client();
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut ids = HashSet::new();
    for _ in 0..REQUESTS {
        let calls = calls.clone();
        let tx = tx.clone();
        let id = client.execute::<serde_json::Value, _>(RequestParams::get("/pet/7"), move |c| {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send((c.request_id, c.state()));
        });
        assert!(ids.insert(id), "request ids must be unique");
    }
    drop(tx);

    let mut completed = HashSet::new();
    while let Some((id, state)) = rx.recv().await {
        assert_eq!(state, RequestState::Completed);
        assert!(completed.insert(id), "completion delivered twice for {id}");
    }

    assert_eq!(completed, ids);
    assert_eq!(calls.load(Ordering::SeqCst), REQUESTS);
    assert_eq!(client.request_queue_size(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_subset_of_hanging_requests() {
    let hanging = HangingServer::start().await;
    let fixture = MockServerFixture::new().await;
    let client = fixture.pool.get(&hanging.base_url);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let ids: Vec<RequestId> = (0..10)
        .map(|i| {
            let tx = tx.clone();
            let params = RequestParams::get(format!("/slow/{i}")).timeout(Duration::from_secs(30));
            client.execute::<serde_json::Value, _>(params, move |c| {
                let _ = tx.send((c.request_id, c.state()));
            })
        })
        .collect();
    drop(tx);

    assert_eq!(client.request_queue_size(), 10);
    let task = client.task(ids[0]).expect("tracked while in flight");
    assert!(task.url().ends_with("/slow/0"));
    assert!(!task.is_cancelled());

    for id in ids.iter().step_by(2) {
        assert!(client.cancel(*id));
    }
    assert_eq!(client.request_queue_size(), 5);

    let mut cancelled = HashSet::new();
    for _ in 0..5 {
        let (id, state) = rx.recv().await.expect("cancelled completion");
        assert_eq!(state, RequestState::Cancelled);
        cancelled.insert(id);
    }
    let expected: HashSet<RequestId> = ids.iter().step_by(2).copied().collect();
    assert_eq!(cancelled, expected);

    // Second cancel of a terminated request is a no-op.
    assert!(!client.cancel(ids[0]));
    assert!(task.is_cancelled());

    for id in ids.iter().skip(1).step_by(2) {
        assert!(client.cancel(*id));
    }
    let mut rest = 0;
    while let Some((_, state)) = rx.recv().await {
        assert_eq!(state, RequestState::Cancelled);
        rest += 1;
    }
    assert_eq!(rest, 5);
    assert_eq!(client.request_queue_size(), 0);
}

#[tokio::test]
async fn test_cancel_unknown_id_is_noop() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("GET", "/pet/1", 200, "{}").await;
    let client = fixture.client();

    let (id, response) = client.execute_future::<serde_json::Value>(RequestParams::get("/pet/1"));
    assert_eq!(response.request_id(), id);
    response.await.unwrap();

    assert!(!client.cancel(id));
    assert!(client.task(id).is_none());
    assert_eq!(client.request_queue_size(), 0);
}

#[tokio::test]
async fn test_cancelled_future_resolves_to_cancelled() {
    let hanging = HangingServer::start().await;
    let fixture = MockServerFixture::new().await;
    let client = fixture.pool.get(&hanging.base_url);

    let (id, response) = client.execute_future::<serde_json::Value>(RequestParams::get("/slow"));
    assert!(client.cancel(id));
    let err = response.await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_default_header_updates_during_traffic() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("GET", "/pet/1", 200, "{}").await;
    let client = fixture.client();

    let writer = {
        let client = client.clone();
        tokio::spawn(async move {
            for i in 0..100 {
                client.set_default_header("X-Seq", &i.to_string());
                tokio::task::yield_now().await;
            }
        })
    };

    let mut pending = Vec::new();
    for _ in 0..20 {
        let (_, response) = client.execute_future::<serde_json::Value>(RequestParams::get("/pet/1"));
        pending.push(response);
    }
    writer.await.unwrap();
    for result in futures::future::join_all(pending).await {
        result.unwrap();
    }
    assert_eq!(client.default_headers().get("x-seq"), Some("99"));
}
