use std::sync::Arc;

use futures::{Stream, StreamExt as _};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_tungstenite::tungstenite::Bytes;

use crate::Result;
use crate::error::Error;
use crate::ws::ConnectionManager;
use crate::ws::config::Config;
use crate::ws::traits::SocketTransport;

/// Decoder from raw payload bytes to a received message.
///
/// `None` means the payload did not represent a valid message; the stream
/// surfaces it as a decode error and continues.
pub type DecodeFn<Rx> = Arc<dyn Fn(&[u8]) -> Option<Rx> + Send + Sync>;

/// Encoder from an outgoing message to payload bytes.
///
/// `None` means the message cannot be serialized; nothing is sent.
pub type EncodeFn<Tx> = Arc<dyn Fn(&Tx) -> Option<Bytes> + Send + Sync>;

/// Generic typed client exchanging one JSON message shape pair over a
/// persistent WebSocket connection.
///
/// The client is parameterized over the received message type `Rx` and the
/// sent message type `Tx`, with the codec injected at construction. Each
/// transport event maps to exactly one typed event in arrival order, and a
/// message that fails to decode produces an error value without ending the
/// stream.
///
/// # Examples
///
/// ```rust, no_run
/// use futures::StreamExt as _;
/// use serde::{Deserialize, Serialize};
/// use websocket_chat_client::chat::Client;
/// use websocket_chat_client::ws::config::Config;
///
/// #[derive(Debug, Deserialize)]
/// struct Incoming {
///     message_text: String,
/// }
///
/// #[derive(Serialize)]
/// struct Outgoing {
///     message_text: String,
/// }
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client: Client<Incoming, Outgoing> =
///         Client::new("wss://chat.example.com/ws", Config::default())?;
///
///     let mut stream = Box::pin(client.subscribe());
///
///     client
///         .send(&Outgoing {
///             message_text: "hello".to_owned(),
///         })
///         .await?;
///
///     while let Some(message) = stream.next().await {
///         println!("Received: {:?}", message?);
///     }
///
///     Ok(())
/// }
/// ```
pub struct Client<Rx, Tx> {
    inner: Arc<ClientInner<Rx, Tx>>,
}

impl<Rx, Tx> Clone for Client<Rx, Tx> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ClientInner<Rx, Tx> {
    /// Underlying socket transport
    transport: Arc<dyn SocketTransport>,
    /// Decoder for inbound payloads
    decode: DecodeFn<Rx>,
    /// Encoder for outbound messages
    encode: EncodeFn<Tx>,
}

impl<Rx, Tx> Client<Rx, Tx> {
    /// Create a client for the given endpoint with the default JSON codec.
    ///
    /// The endpoint is validated here; the connection itself is established
    /// lazily by the first [`subscribe`](Self::subscribe) call.
    pub fn new(endpoint: &str, config: Config) -> Result<Self>
    where
        Rx: DeserializeOwned,
        Tx: Serialize,
    {
        Self::with_codec(
            endpoint,
            config,
            |bytes: &[u8]| serde_json::from_slice(bytes).ok(),
            |message: &Tx| serde_json::to_vec(message).ok().map(Bytes::from),
        )
    }

    /// Create a client for the given endpoint with an injected codec.
    ///
    /// Use this when the wire format is not plain serde_json, e.g. custom
    /// date handling or field casing.
    pub fn with_codec<D, E>(endpoint: &str, config: Config, decode: D, encode: E) -> Result<Self>
    where
        D: Fn(&[u8]) -> Option<Rx> + Send + Sync + 'static,
        E: Fn(&Tx) -> Option<Bytes> + Send + Sync + 'static,
    {
        let transport = ConnectionManager::new(endpoint, config)?;
        Ok(Self::from_transport(transport, decode, encode))
    }

    /// Create a client over an existing transport.
    ///
    /// Accepts any [`SocketTransport`] implementation, which also makes the
    /// client testable against a scripted transport double.
    pub fn from_transport<T, D, E>(transport: T, decode: D, encode: E) -> Self
    where
        T: SocketTransport,
        D: Fn(&[u8]) -> Option<Rx> + Send + Sync + 'static,
        E: Fn(&Tx) -> Option<Bytes> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ClientInner {
                transport: Arc::new(transport),
                decode: Arc::new(decode),
                encode: Arc::new(encode),
            }),
        }
    }

    /// Subscribe to the decoded message stream, starting the underlying
    /// connection on first use.
    ///
    /// The mapping from transport events is 1:1 and order-preserving: a
    /// payload becomes `Ok(message)` or a decode error, an absent payload
    /// becomes a decode error, and a transport failure is propagated as a
    /// WebSocket error value. Nothing is dropped, reordered, or batched,
    /// and a decode failure never terminates the stream.
    pub fn subscribe(&self) -> impl Stream<Item = Result<Rx>> + use<Rx, Tx> {
        let decode = Arc::clone(&self.inner.decode);

        self.inner.transport.subscribe().map(move |event| match event {
            Ok(Some(payload)) => match (*decode)(&payload) {
                Some(message) => Ok(message),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(len = payload.len(), "Failed to decode message payload");
                    Err(Error::decode())
                }
            },
            Ok(None) => Err(Error::decode()),
            Err(e) => Err(e.into()),
        })
    }

    /// Send one typed message.
    ///
    /// Encoding happens before any transport interaction: a message that
    /// fails to encode resolves with an encode error and the socket is
    /// never touched. Otherwise the transport's outcome is propagated
    /// unchanged.
    pub async fn send(&self, message: &Tx) -> Result<()> {
        let Some(payload) = (*self.inner.encode)(message) else {
            return Err(Error::encode());
        };

        self.inner.transport.send(payload).await.map_err(Error::from)
    }

    /// Close the underlying connection.
    ///
    /// Idempotent pass-through to the transport; safe to call at any point
    /// in the lifecycle, including before the first subscription.
    pub fn close_connection(&self) {
        self.inner.transport.close();
    }
}
