//! Shared test helpers for integration tests.

// Not every test target uses every helper.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chathub_api::state::AppState;
use chathub_core::config::{AppConfig, PubSubConfig};
use chathub_core::result::AppResult;
use chathub_core::traits::BackendNotifier;
use chathub_realtime::PubSubEngine;

/// A connected WebSocket test client.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

/// Notifier that records every notice for later assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub new_topics: Mutex<Vec<String>>,
    pub reaped_batches: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl BackendNotifier for RecordingNotifier {
    async fn startup(&self) -> AppResult<()> {
        Ok(())
    }

    async fn new_topic(&self, topic: &str) -> AppResult<()> {
        self.new_topics.lock().await.push(topic.to_string());
        Ok(())
    }

    async fn topics_reaped(&self, topics: &[String]) -> AppResult<()> {
        self.reaped_batches.lock().await.push(topics.to_vec());
        Ok(())
    }
}

/// A running server on an ephemeral port.
pub struct TestApp {
    /// Bound address.
    pub addr: SocketAddr,
    /// Direct engine handle for registry assertions.
    pub engine: Arc<PubSubEngine>,
    /// The notifier the engine reports to.
    pub notifier: Arc<RecordingNotifier>,
    /// HTTP client for the REST endpoints.
    pub http: reqwest::Client,
}

impl TestApp {
    /// Starts a server with default pub/sub settings.
    pub async fn spawn() -> Self {
        Self::spawn_with(PubSubConfig::default()).await
    }

    /// Starts a server with the given pub/sub settings.
    pub async fn spawn_with(pubsub: PubSubConfig) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = Arc::new(PubSubEngine::new(
            pubsub,
            Arc::clone(&notifier) as Arc<dyn BackendNotifier>,
        ));
        engine.spawn_janitor();

        let state = AppState {
            config: Arc::new(AppConfig::default()),
            engine: Arc::clone(&engine),
            banner: Arc::new("<html><body>ChatHub</body></html>".to_string()),
        };
        let app = chathub_api::build_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server");
        });

        Self {
            addr,
            engine,
            notifier,
            http: reqwest::Client::new(),
        }
    }

    /// Opens a WebSocket connection to the server.
    pub async fn connect(&self) -> WsClient {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", self.addr))
            .await
            .expect("websocket connect");
        ws
    }

    /// Opens a connection and completes the hello handshake.
    pub async fn connect_hello(&self) -> WsClient {
        let mut ws = self.connect().await;
        send(&mut ws, r#"1 hello ["test client", null]"#).await;
        let reply = expect_text(&mut ws).await;
        assert!(reply.starts_with("1 ok"), "unexpected hello reply: {reply}");
        ws
    }

    /// Publishes through POST /pub and returns the delivered count.
    pub async fn publish(&self, channels: &[&str], command: &str, arguments: Value) -> u64 {
        let body = json!({
            "channels": channels,
            "command": command,
            "arguments": arguments,
        });
        let resp = self
            .http
            .post(format!("http://{}/pub", self.addr))
            .json(&body)
            .send()
            .await
            .expect("publish request");
        assert!(resp.status().is_success(), "publish failed: {}", resp.status());
        let body: Value = resp.json().await.expect("publish response body");
        body["count"].as_u64().expect("count field")
    }
}

/// Sends a text frame.
pub async fn send(ws: &mut WsClient, text: &str) {
    ws.send(Message::text(text)).await.expect("send frame");
}

/// Subscribes to a topic and waits for the acknowledgement.
pub async fn subscribe(ws: &mut WsClient, id: i64, topic: &str) {
    send(ws, &format!(r#"{id} sub "{topic}""#)).await;
    let reply = expect_text(ws).await;
    assert_eq!(reply, format!("{id} ok"));
}

/// Reads frames until the next text frame, skipping control frames.
pub async fn expect_text(ws: &mut WsClient) -> String {
    loop {
        let frame = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a text frame")
            .expect("stream ended")
            .expect("read frame");
        match frame {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Reads frames until the connection closes; returns the close frame.
pub async fn expect_close(ws: &mut WsClient) -> (CloseCode, String) {
    loop {
        let frame = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for close");
        match frame {
            None => panic!("stream ended without a close frame"),
            Some(Ok(Message::Close(Some(frame)))) => {
                return (frame.code, frame.reason.to_string());
            }
            Some(Ok(Message::Close(None))) => panic!("close frame carried no code"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => panic!("read error while awaiting close: {e}"),
        }
    }
}

/// Asserts that no text frame arrives within the window.
pub async fn expect_silence(ws: &mut WsClient, window: Duration) {
    let outcome = tokio::time::timeout(window, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    if let Ok(text) = outcome {
        panic!("expected silence, got: {text}");
    }
}
