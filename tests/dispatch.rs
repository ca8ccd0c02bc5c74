//! Dispatcher behaviour: timeouts, read retries, write single-shot, reply isolation.

mod common;

use ari_nats_tokio::{AriError, Operation, Options, Reply, Transport};
use bytes::Bytes;
use common::{settle, Answer, Gateway};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const SUBJECT: &str = "ari.channels.list";

#[tokio::test(start_paused = true)]
async fn zero_timeout_uses_default() {
    let gw = Gateway::new();
    gw.route(SUBJECT, |_, _| Answer::Silent)
        .await;
    let client = gw.client(Options::default().with_request_timeout(Duration::ZERO));

    let started = Instant::now();
    let err = client
        .channel()
        .list()
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "expected timeout, got {err}");
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(250), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn reply_after_timeout_is_a_timeout() {
    let gw = Gateway::new();
    gw.route(SUBJECT, |_, _| {
        Answer::After(Duration::from_millis(150), Reply::ok(json!([])).unwrap())
    })
    .await;
    let client = gw.client(Options::default().with_request_timeout(Duration::from_millis(100)));

    let started = Instant::now();
    let err = client
        .channel()
        .list()
        .await
        .unwrap_err();
    assert!(matches!(err, AriError::Timeout { timeout_ms: 100 }));
    assert!(started.elapsed() < Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn reads_retry_up_to_limit() {
    let gw = Gateway::new();
    let route = gw
        .route(SUBJECT, |_, _| Answer::Silent)
        .await;
    let client = gw.client(
        Options::default()
            .with_request_timeout(Duration::from_millis(50))
            .with_read_operation_retry_count(2),
    );

    let started = Instant::now();
    let err = client
        .channel()
        .list()
        .await
        .unwrap_err();
    let elapsed = started.elapsed();
    settle().await;

    assert!(err.is_timeout());
    assert_eq!(route.hits(), 3);
    // back to back, no backoff
    assert!(elapsed < Duration::from_millis(160), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn read_recovers_on_retry() {
    let gw = Gateway::new();
    let route = gw
        .route(SUBJECT, |_, n| {
            if n < 3 {
                Answer::Silent
            } else {
                Reply::ok(json!([{ "id": "c1", "state": "Up" }]))
                    .unwrap()
                    .into()
            }
        })
        .await;
    let client = gw.client(
        Options::default()
            .with_request_timeout(Duration::from_millis(50))
            .with_read_operation_retry_count(2),
    );

    let channels = client
        .channel()
        .list()
        .await
        .unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].id, "c1");
    assert_eq!(route.hits(), 3);
}

#[tokio::test(start_paused = true)]
async fn writes_are_never_retried() {
    let gw = Gateway::new();
    let route = gw
        .route("ari.channels.answer.*", |_, _| Answer::Silent)
        .await;
    let client = gw.client(
        Options::default()
            .with_request_timeout(Duration::from_millis(50))
            .with_read_operation_retry_count(5),
    );

    let err = client
        .channel()
        .answer("c1")
        .await
        .unwrap_err();
    settle().await;

    assert!(err.is_timeout());
    assert_eq!(route.hits(), 1);
}

#[tokio::test]
async fn application_error_is_not_retried() {
    let gw = Gateway::new();
    let route = gw
        .route("ari.channels.get.*", |_, _| Reply::error("Channel not found"))
        .await;
    let client = gw.client(Options::default().with_read_operation_retry_count(3));

    let err = client
        .channel()
        .get("missing")
        .await
        .unwrap_err();
    settle().await;

    match err {
        AriError::Application { message } => assert_eq!(message, "Channel not found"),
        other => panic!("expected application error, got {other:?}"),
    }
    assert_eq!(route.hits(), 1);
}

#[tokio::test]
async fn malformed_reply_is_not_retried() {
    let gw = Gateway::new();
    let mut sub = gw
        .bus
        .subscribe(SUBJECT)
        .await
        .unwrap();
    let bus = gw
        .bus
        .clone();
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = hits.clone();
    tokio::spawn(async move {
        while let Some(msg) = sub
            .recv()
            .await
        {
            seen.fetch_add(1, Ordering::SeqCst);
            if let Some(inbox) = msg.reply {
                let _ = bus
                    .publish(&inbox, Bytes::from_static(b"<html>"))
                    .await;
            }
        }
    });
    let client = gw.client(Options::default().with_read_operation_retry_count(3));

    let err = client
        .channel()
        .list()
        .await
        .unwrap_err();
    settle().await;

    assert!(matches!(err, AriError::Json(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_responder_is_a_transport_error() {
    let gw = Gateway::new();
    let client = gw.client(Options::default().with_read_operation_retry_count(2));
    let err = client
        .sound()
        .get("hello-world")
        .await
        .unwrap_err();
    assert!(matches!(err, AriError::Transport { .. }), "{err:?}");
}

#[tokio::test]
async fn transport_failures_on_reads_are_retried() {
    let gw = Gateway::new();
    let (client, transport) =
        gw.flaky_client(usize::MAX, Options::default().with_read_operation_retry_count(2));

    let err = client
        .channel()
        .list()
        .await
        .unwrap_err();

    assert!(err.is_transport(), "{err:?}");
    assert_eq!(transport.attempts(), 3);
}

#[tokio::test]
async fn read_recovers_after_transport_failure() {
    let gw = Gateway::new();
    let route = gw
        .reply_with(SUBJECT, json!([{ "id": "c1", "state": "Up" }]))
        .await;
    let (client, transport) =
        gw.flaky_client(2, Options::default().with_read_operation_retry_count(2));

    let channels = client
        .channel()
        .list()
        .await
        .unwrap();

    assert_eq!(channels[0].id, "c1");
    assert_eq!(transport.attempts(), 3);
    assert_eq!(route.hits(), 1);
}

#[tokio::test]
async fn write_transport_failure_is_not_retried() {
    let gw = Gateway::new();
    let route = gw
        .accept("ari.channels.answer.*")
        .await;
    let (client, transport) =
        gw.flaky_client(1, Options::default().with_read_operation_retry_count(5));

    let err = client
        .channel()
        .answer("c1")
        .await
        .unwrap_err();
    settle().await;

    assert!(err.is_transport(), "{err:?}");
    assert_eq!(transport.attempts(), 1);
    assert_eq!(route.hits(), 0);
}

#[tokio::test(start_paused = true)]
async fn stale_reply_does_not_leak_into_next_request() {
    let gw = Gateway::new();
    gw.route(SUBJECT, |_, n| {
        let (delay, id) = if n == 1 {
            (600, "stale")
        } else {
            (200, "fresh")
        };
        Answer::After(
            Duration::from_millis(delay),
            Reply::ok(json!([{ "id": id }])).unwrap(),
        )
    })
    .await;
    let client = gw.client(Options::default().with_request_timeout(Duration::from_millis(500)));

    assert!(client
        .channel()
        .list()
        .await
        .unwrap_err()
        .is_timeout());

    // the first reply lands while this request is still waiting
    let channels = client
        .channel()
        .list()
        .await
        .unwrap();
    assert_eq!(channels[0].id, "fresh");
    // only the responder is left; no inbox outlived its request
    assert_eq!(gw.bus.subscription_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_get_their_own_replies() {
    let gw = Gateway::new();
    gw.route("ari.test.echo", |msg, _| {
        let body: Value = serde_json::from_slice(&msg.payload).unwrap();
        Reply::ok(body).unwrap()
    })
    .await;
    let client = gw.client(Options::default().with_request_timeout(Duration::from_secs(5)));

    let mut tasks = Vec::new();
    for i in 0..50u32 {
        let conn = client
            .connection()
            .clone();
        tasks.push(tokio::spawn(async move {
            let echoed: Value = conn
                .read_with("ari.test.echo", &json!({ "n": i }))
                .await
                .unwrap();
            (i, echoed)
        }));
    }
    for task in tasks {
        let (i, echoed) = task
            .await
            .unwrap();
        assert_eq!(echoed, json!({ "n": i }));
    }
}

#[tokio::test]
async fn dispatch_returns_reply_envelope() {
    let gw = Gateway::new();
    gw.reply_with("ari.test.raw", json!({ "ok": true }))
        .await;
    let client = gw.client(Options::default());
    let reply = client
        .connection()
        .dispatch(Operation::Write, "ari.test.raw", Bytes::new())
        .await
        .unwrap();
    assert!(reply.is_success());
    assert_eq!(reply.data(), Some(&json!({ "ok": true })));
}
