//! Integration tests against a live ARI gateway.
//!
//! These tests require NATS on 127.0.0.1:4222 with an ARI gateway bridged to Asterisk
//! on subject prefix `ari`.
//! Run with: cargo test --test live_gateway -- --ignored

use ari_nats_tokio::constants::DEFAULT_NATS_URL;
use ari_nats_tokio::resources::CreateBridge;
use ari_nats_tokio::{AriError, Client, EventType, Options};
use std::time::Duration;
use tokio::time::Instant;

async fn connect() -> Client {
    let options = Options::default()
        .with_request_timeout(Duration::from_secs(2))
        .with_read_operation_retry_count(1);
    Client::connect(DEFAULT_NATS_URL, options)
        .await
        .expect("failed to connect to NATS")
}

#[tokio::test]
#[ignore]
async fn live_asterisk_info() {
    let client = connect().await;

    let info = client
        .asterisk()
        .info(&[])
        .await
        .unwrap();
    let system = info
        .system
        .expect("info should carry a system section");
    assert!(!system
        .version
        .is_empty());

    client
        .cleanup()
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn live_list_resources() {
    let client = connect().await;

    client
        .channel()
        .list()
        .await
        .unwrap();
    client
        .application()
        .list()
        .await
        .unwrap();
    client
        .asterisk()
        .modules()
        .list()
        .await
        .unwrap();

    client
        .cleanup()
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn live_missing_channel_is_application_error() {
    let client = connect().await;

    let started = Instant::now();
    let err = client
        .channel()
        .get("no-such-channel")
        .await
        .unwrap_err();
    assert!(
        matches!(err, AriError::Application { .. }),
        "expected application error, got {err:?}"
    );
    // answered, not timed out
    assert!(started.elapsed() < Duration::from_secs(2));

    client
        .cleanup()
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn live_bridge_create_and_events() {
    let client = connect().await;
    let mut events = client
        .bus()
        .subscribe(EventType::BridgeDestroyed)
        .await
        .unwrap();

    let bridge = client
        .bridge()
        .create(&CreateBridge::mixing().with_name("ari-nats-live"))
        .await
        .unwrap();
    client
        .bridge()
        .delete(&bridge.id)
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timeout waiting for BridgeDestroyed")
        .expect("event stream closed");
    assert_eq!(event.bridge_id(), Some(bridge.id.as_str()));

    client
        .cleanup()
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn live_cleanup_then_request_fails() {
    let client = connect().await;
    client
        .cleanup()
        .await
        .unwrap();
    assert!(matches!(
        client
            .sound()
            .get("hello-world")
            .await,
        Err(AriError::ConnectionClosed)
    ));
}
