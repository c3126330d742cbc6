//! Integration tests for fan-out publishing and topic lifecycle.

mod helpers;

use std::time::Duration;

use serde_json::json;

use chathub_core::config::PubSubConfig;

use helpers::{TestApp, expect_silence, expect_text, send, subscribe};

#[tokio::test]
async fn publish_fans_out_to_every_subscriber() {
    let app = TestApp::spawn().await;
    let mut a = app.connect_hello().await;
    let mut b = app.connect_hello().await;

    subscribe(&mut a, 2, "room1").await;
    subscribe(&mut b, 2, "room1").await;

    let count = app.publish(&["room1"], "msg", json!("hi")).await;
    assert_eq!(count, 2);

    assert_eq!(expect_text(&mut a).await, r#"-1 msg "hi""#);
    assert_eq!(expect_text(&mut b).await, r#"-1 msg "hi""#);
    expect_silence(&mut a, Duration::from_millis(200)).await;
    expect_silence(&mut b, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn multi_topic_publish_delivers_once_per_client() {
    let app = TestApp::spawn().await;
    let mut a = app.connect_hello().await;

    subscribe(&mut a, 2, "room1").await;
    subscribe(&mut a, 3, "room2").await;

    let count = app.publish(&["room1", "room2"], "msg", json!("hi")).await;
    assert_eq!(count, 1);

    assert_eq!(expect_text(&mut a).await, r#"-1 msg "hi""#);
    expect_silence(&mut a, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn global_publish_reaches_every_client_that_said_hello() {
    let app = TestApp::spawn().await;
    let mut a = app.connect_hello().await;
    let mut b = app.connect_hello().await;

    // A JSON null argument deserializes to "no arguments" on this endpoint.
    let count = app.publish(&[], "reload_badges", json!(null)).await;
    assert_eq!(count, 2);

    assert_eq!(expect_text(&mut a).await, "-1 reload_badges");
    assert_eq!(expect_text(&mut b).await, "-1 reload_badges");
}

#[tokio::test]
async fn unsubscribed_clients_stop_receiving() {
    let app = TestApp::spawn().await;
    let mut a = app.connect_hello().await;

    subscribe(&mut a, 2, "room1").await;
    send(&mut a, r#"3 unsub "room1""#).await;
    assert_eq!(expect_text(&mut a).await, "3 ok");

    let count = app.publish(&["room1"], "msg", json!("hi")).await;
    assert_eq!(count, 0);
    expect_silence(&mut a, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn disconnected_clients_are_withdrawn_before_the_endpoint_closes() {
    let app = TestApp::spawn().await;
    let mut a = app.connect_hello().await;
    subscribe(&mut a, 2, "room1").await;

    drop(a);

    // Give teardown a moment to withdraw the endpoint from every set.
    let mut count = u64::MAX;
    for _ in 0..50 {
        count = app.publish(&["room1"], "msg", json!("hi")).await;
        if count == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(count, 0);
    assert_eq!(app.engine.registry.subscriber_count("room1").await, 0);
    assert_eq!(app.engine.registry.global_count().await, 0);
}

#[tokio::test]
async fn janitor_reaps_abandoned_topics_and_reports_the_batch() {
    let app = TestApp::spawn_with(PubSubConfig {
        reap_interval_secs: 1,
        ..PubSubConfig::default()
    })
    .await;
    let mut a = app.connect_hello().await;

    subscribe(&mut a, 2, "ephemeral").await;
    send(&mut a, r#"3 unsub "ephemeral""#).await;
    assert_eq!(expect_text(&mut a).await, "3 ok");

    let mut reaped = false;
    for _ in 0..50 {
        if !app.engine.registry.has_topic("ephemeral").await {
            reaped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(reaped, "ephemeral topic was never reaped");

    let batches = app.notifier.reaped_batches.lock().await;
    assert!(
        batches
            .iter()
            .any(|batch| batch.contains(&"ephemeral".to_string())),
        "cleanup notice missing: {batches:?}"
    );
}

#[tokio::test]
async fn new_topics_are_reported_to_the_backend() {
    let app = TestApp::spawn().await;
    let mut a = app.connect_hello().await;

    subscribe(&mut a, 2, "fresh").await;

    let mut reported = false;
    for _ in 0..50 {
        if app.notifier.new_topics.lock().await.contains(&"fresh".to_string()) {
            reported = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(reported, "new-topic notice never arrived");
}

#[tokio::test]
async fn resubscribing_after_publish_is_idempotent() {
    let app = TestApp::spawn().await;
    let mut a = app.connect_hello().await;

    subscribe(&mut a, 2, "room1").await;
    subscribe(&mut a, 3, "room1").await;

    let count = app.publish(&["room1"], "msg", json!("hi")).await;
    assert_eq!(count, 1);

    assert_eq!(expect_text(&mut a).await, r#"-1 msg "hi""#);
    expect_silence(&mut a, Duration::from_millis(200)).await;
}
