//! Integration tests for the connection lifecycle and wire protocol.

mod helpers;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use chathub_core::config::PubSubConfig;

use helpers::{TestApp, expect_close, expect_text, send};

#[tokio::test]
async fn first_message_must_be_hello() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;

    send(&mut ws, "1 foo").await;

    let (code, reason) = expect_close(&mut ws).await;
    assert_eq!(code, CloseCode::Policy);
    assert_eq!(reason, "Error - the first message sent must be a 'hello'");
}

#[tokio::test]
async fn hello_is_acknowledged_with_the_client_id() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;

    send(&mut ws, r#"1 hello ["test client", null]"#).await;

    let reply = expect_text(&mut ws).await;
    assert!(reply.starts_with("1 ok \""), "unexpected reply: {reply}");
}

#[tokio::test]
async fn binary_frames_close_the_connection() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_hello().await;

    ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();

    let (code, reason) = expect_close(&mut ws).await;
    assert_eq!(code, CloseCode::Unsupported);
    assert_eq!(reason, "got binary packet");
}

#[tokio::test]
async fn zero_id_frames_are_dropped_silently() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_hello().await;

    // Dropped without a reply or a close; the next command still works.
    send(&mut ws, r#"0 sub "room1""#).await;
    send(&mut ws, r#"2 sub "room1""#).await;

    let reply = expect_text(&mut ws).await;
    assert_eq!(reply, "2 ok");
}

#[tokio::test]
async fn unknown_commands_get_an_error_reply() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_hello().await;

    send(&mut ws, "2 frobnicate").await;

    let reply = expect_text(&mut ws).await;
    assert!(reply.starts_with("2 error"), "unexpected reply: {reply}");
}

#[tokio::test]
async fn bad_argument_shapes_keep_the_connection_open() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_hello().await;

    send(&mut ws, "2 sub [1,2,3]").await;
    let reply = expect_text(&mut ws).await;
    assert!(reply.starts_with("2 error"), "unexpected reply: {reply}");

    send(&mut ws, r#"3 sub "room1""#).await;
    let reply = expect_text(&mut ws).await;
    assert_eq!(reply, "3 ok");
}

#[tokio::test]
async fn deferred_replies_arrive_with_the_client_id() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_hello().await;

    send(&mut ws, r#"5 emote_stats ["party_parrot", 2]"#).await;

    let reply = expect_text(&mut ws).await;
    assert_eq!(reply, "5 ok");
}

#[tokio::test]
async fn idle_client_is_closed_after_missed_pings() {
    let app = TestApp::spawn_with(PubSubConfig {
        ping_interval_secs: 1,
        ping_miss_limit: 1,
        ..PubSubConfig::default()
    })
    .await;
    let mut ws = app.connect_hello().await;

    // Stop reading, so the client library cannot answer pings. The first
    // quiet interval already hits the miss limit.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let (code, reason) = expect_close(&mut ws).await;
    assert_eq!(code, CloseCode::Status);
    assert_eq!(reason, "no ping replies for 5 minutes");
}

#[tokio::test]
async fn ponging_client_stays_connected() {
    let app = TestApp::spawn_with(PubSubConfig {
        ping_interval_secs: 1,
        ping_miss_limit: 2,
        ..PubSubConfig::default()
    })
    .await;
    let mut ws = app.connect_hello().await;

    // Keep reading: the client library answers every ping with a pong,
    // which resets the miss counter each interval.
    let closed = tokio::time::timeout(Duration::from_millis(3500), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_err(), "connection closed despite pongs");

    send(&mut ws, r#"4 sub "room1""#).await;
    let reply = expect_text(&mut ws).await;
    assert_eq!(reply, "4 ok");
}

#[tokio::test]
async fn non_upgrade_requests_get_the_banner() {
    let app = TestApp::spawn().await;

    let resp = app
        .http
        .get(format!("http://{}/", app.addr))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let body = resp.text().await.unwrap();
    assert!(body.contains("ChatHub"));
}

#[tokio::test]
async fn health_reports_engine_state() {
    let app = TestApp::spawn().await;
    let _ws = app.connect_hello().await;

    let resp = app
        .http
        .get(format!("http://{}/health", app.addr))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["metrics"]["connections_active"], 1);
}
