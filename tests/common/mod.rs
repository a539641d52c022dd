#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Not every integration test file exercises every helper"
)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Bytes;
use websocket_chat_client::chat::Client;
use websocket_chat_client::ws::WsError;
use websocket_chat_client::ws::traits::{InboundEvent, SocketTransport};

/// Wire-format message with the snake_case casing the chat server emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleMessage {
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OptionalMessage {
    pub message_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComplexMessage {
    pub id: i64,
    pub sender_name: String,
    #[serde(with = "server_date")]
    pub date: DateTime<FixedOffset>,
    pub text: String,
    pub tags: Vec<Tag>,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

/// Placeholder side of the message pair for one-directional tests.
#[derive(Debug, Serialize, Deserialize)]
pub struct Empty;

/// Server timestamps use the fixed `2021-12-11T20:13:44+0000` layout.
pub mod server_date {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn serialize<S: Serializer>(
        date: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Scripted in-memory transport mirroring the socket manager's contract.
///
/// Inbound events are published on a broadcast channel, so subscription
/// semantics (multicast, subscribe-before-publish) match the real
/// connection manager. Outbound sends are recorded with a counter.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

struct MockInner {
    events_tx: broadcast::Sender<InboundEvent>,
    sent: Mutex<Vec<Bytes>>,
    send_count: AtomicUsize,
    send_failure: Mutex<Option<WsError>>,
    closed: AtomicBool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(MockInner {
                events_tx,
                sent: Mutex::new(Vec::new()),
                send_count: AtomicUsize::new(0),
                send_failure: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Publish a payload carrying the given JSON text, or an absent payload.
    pub fn simulate_json(&self, json: Option<&str>) {
        let payload = json.map(|json| Bytes::from(json.to_owned().into_bytes()));
        drop(self.inner.events_tx.send(Ok(payload)));
    }

    /// Publish raw payload bytes.
    pub fn simulate_payload(&self, payload: Bytes) {
        drop(self.inner.events_tx.send(Ok(Some(payload))));
    }

    /// Publish a transport failure.
    pub fn simulate_error(&self, error: WsError) {
        drop(self.inner.events_tx.send(Err(error)));
    }

    /// Make every subsequent send resolve with the given error.
    pub fn fail_sends_with(&self, error: WsError) {
        *self.inner.send_failure.lock().unwrap() = Some(error);
    }

    /// Frames passed to `send`, in order.
    pub fn sent(&self) -> Vec<Bytes> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// Number of times `send` was invoked on this transport.
    pub fn send_count(&self) -> usize {
        self.inner.send_count.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocketTransport for MockTransport {
    fn subscribe(&self) -> BoxStream<'static, InboundEvent> {
        let mut rx = self.inner.events_tx.subscribe();
        Box::pin(stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(count)) => yield Err(WsError::Lagged { count }),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn send(&self, payload: Bytes) -> Result<(), WsError> {
        self.inner.send_count.fetch_add(1, Ordering::SeqCst);
        self.inner.sent.lock().unwrap().push(payload);

        match self.inner.send_failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}

/// Client over the given transport with the default JSON codec.
pub fn json_client<Rx, Tx>(transport: MockTransport) -> Client<Rx, Tx>
where
    Rx: DeserializeOwned,
    Tx: Serialize,
{
    Client::from_transport(
        transport,
        |bytes: &[u8]| serde_json::from_slice(bytes).ok(),
        |message: &Tx| serde_json::to_vec(message).ok().map(Bytes::from),
    )
}
