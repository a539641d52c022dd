#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::{BoxStream, SplitSink, SplitStream};
use futures::{SinkExt as _, Stream, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::config::Config;
use super::error::WsError;
use super::traits::{InboundEvent, SocketTransport};
use crate::error::Error;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle state.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Constructed, socket not opened yet
    Idle,
    /// Receive loop armed and socket opening or open
    Open,
    /// Closed locally or by the remote session; terminal
    Closed,
}

impl ConnectionState {
    /// Check if the connection has been started and not yet closed.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Commands consumed by the writer task.
enum Command {
    Send(Bytes, oneshot::Sender<Result<(), WsError>>),
    Close,
}

/// Owns exactly one WebSocket connection and exposes it as an event stream.
///
/// The connection is opened lazily by the first [`subscribe`](Self::subscribe)
/// call, which arms a receive loop that classifies every inbound frame and
/// republishes it on a broadcast channel. Receive failures are published as
/// values on the same channel and the loop re-arms immediately; only the end
/// of the underlying socket (or a local [`close`](Self::close)) transitions
/// the connection to [`ConnectionState::Closed`]. A closed connection is not
/// reusable.
///
/// Outgoing sends are drained by a dedicated writer task so a pending write
/// never stalls reception. Concurrent sends are acknowledged individually.
///
/// # Example
///
/// ```ignore
/// let connection = ConnectionManager::new("wss://example.com/ws", Config::default())?;
///
/// let mut events = Box::pin(connection.subscribe());
/// while let Some(event) = events.next().await {
///     println!("Received: {event:?}");
/// }
/// ```
#[derive(Debug)]
pub struct ConnectionManager {
    endpoint: String,
    config: Config,
    /// Watch channel sender for state changes
    state_tx: watch::Sender<ConnectionState>,
    /// Watch channel receiver for state changes (for use in checking the current state)
    state_rx: watch::Receiver<ConnectionState>,
    /// Sender channel for writer commands
    command_tx: mpsc::UnboundedSender<Command>,
    /// Taken by the connection task on the first `subscribe` call
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    /// Broadcast sender for inbound events
    broadcast_tx: broadcast::Sender<InboundEvent>,
    /// Guards the one-time connection start
    started: AtomicBool,
}

impl ConnectionManager {
    /// Create a new connection manager for the given endpoint.
    ///
    /// Validates the endpoint descriptor; no I/O happens until the first
    /// [`subscribe`](Self::subscribe) call. Construction is the only point
    /// at which this type fails with an error rather than a stream value.
    pub fn new(endpoint: &str, config: Config) -> crate::Result<Self> {
        let url = Url::parse(endpoint)?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::validation(format!(
                    "endpoint must use the ws or wss scheme, got {other}"
                )));
            }
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(config.message_buffer);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

        Ok(Self {
            endpoint: String::from(url),
            config,
            state_tx,
            state_rx,
            command_tx,
            command_rx: Mutex::new(Some(command_rx)),
            broadcast_tx,
            started: AtomicBool::new(false),
        })
    }

    /// Subscribe to inbound events, starting the connection if necessary.
    ///
    /// Each call returns an independent stream onto the same broadcast
    /// channel; all subscribers observe the same events from their
    /// subscription point onward, in arrival order. The stream does not end
    /// on receive failures or session closure (those arrive as values);
    /// consumers cancel by dropping it.
    pub fn subscribe(&self) -> impl Stream<Item = InboundEvent> + use<> {
        self.ensure_started();

        let mut rx = self.broadcast_tx.subscribe();
        stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(count)) => yield Err(WsError::Lagged { count }),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Transmit one binary frame.
    ///
    /// Resolves once the socket write completes or fails. Sends issued
    /// before the connection has been started are queued and flushed when
    /// [`subscribe`](Self::subscribe) opens the socket; sends after the
    /// connection closed resolve with [`WsError::ConnectionClosed`].
    pub async fn send(&self, payload: Bytes) -> Result<(), WsError> {
        if *self.state_rx.borrow() == ConnectionState::Closed {
            return Err(WsError::ConnectionClosed);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Send(payload, reply_tx))
            .map_err(|_e| WsError::ConnectionClosed)?;

        // A dropped reply means the writer terminated before the frame went out.
        reply_rx.await.map_err(|_e| WsError::ConnectionClosed)?
    }

    /// Initiate a graceful shutdown with a "going away" close frame.
    ///
    /// Idempotent, and safe to call before any `subscribe`. The connection
    /// is terminal afterwards; a later `subscribe` will not reopen it.
    pub fn close(&self) {
        let was_closed = *self.state_rx.borrow() == ConnectionState::Closed;
        _ = self.state_tx.send(ConnectionState::Closed);

        if !was_closed {
            _ = self.command_tx.send(Command::Close);
        }
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// One-time guarded start of the connection task.
    fn ensure_started(&self) {
        if *self.state_rx.borrow() == ConnectionState::Closed {
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        // We can recover from a poisoned lock because the receiver slot has
        // no inconsistent intermediate state.
        let receiver = self
            .command_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(command_rx) = receiver else {
            return;
        };

        _ = self.state_tx.send(ConnectionState::Open);

        let endpoint = self.endpoint.clone();
        let config = self.config.clone();
        let broadcast_tx = self.broadcast_tx.clone();
        let state_tx = self.state_tx.clone();

        tokio::spawn(async move {
            Self::connection_loop(endpoint, config, command_rx, broadcast_tx, state_tx).await;
        });
    }

    /// Connect, then run the read loop to completion with a writer task on
    /// the side.
    async fn connection_loop(
        endpoint: String,
        config: Config,
        command_rx: mpsc::UnboundedReceiver<Command>,
        broadcast_tx: broadcast::Sender<InboundEvent>,
        state_tx: watch::Sender<ConnectionState>,
    ) {
        let ws_stream = match connect_async(&endpoint).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%endpoint, error = %e, "Unable to connect");
                _ = broadcast_tx.send(Err(WsError::Connection(Arc::new(e))));
                _ = state_tx.send(ConnectionState::Closed);
                return;
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(%endpoint, "WebSocket connection established");

        let (write, read) = ws_stream.split();
        let closing = Arc::new(AtomicBool::new(false));

        let writer = tokio::spawn(Self::write_loop(
            write,
            command_rx,
            Arc::clone(&closing),
            config,
        ));

        Self::read_loop(read, &broadcast_tx, &closing).await;

        _ = state_tx.send(ConnectionState::Closed);
        // Socket is gone; pending sends fail through their dropped replies.
        writer.abort();
    }

    /// Classify every inbound frame and republish it, re-arming after each
    /// event until the socket ends.
    async fn read_loop(
        mut read: SplitStream<WsStream>,
        broadcast_tx: &broadcast::Sender<InboundEvent>,
        closing: &AtomicBool,
    ) {
        while let Some(frame) = read.next().await {
            let event = match frame {
                Ok(Message::Binary(payload)) => Ok(Some(payload)),
                Ok(Message::Text(text)) => Ok(Some(Bytes::from(text))),
                Ok(Message::Close(frame)) => {
                    // A close frame after a local close is the handshake
                    // reply, not a remote closure.
                    if closing.load(Ordering::SeqCst) {
                        continue;
                    }
                    let code = frame.map_or(CloseCode::Status, |f| f.code);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(code = u16::from(code), "Session closed by remote");
                    Err(WsError::SessionClosed(code))
                }
                Ok(_) => Err(WsError::UnknownFrame),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "WebSocket receive failed");
                    Err(WsError::Connection(Arc::new(e)))
                }
            };

            // Publish without waiting on consumers; a slow subscriber lags
            // rather than stalling reception.
            _ = broadcast_tx.send(event);
        }
    }

    /// Drain queued commands, acknowledging each send individually.
    async fn write_loop(
        mut write: SplitSink<WsStream, Message>,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
        closing: Arc<AtomicBool>,
        config: Config,
    ) {
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::Send(payload, reply) => {
                    let outcome = write
                        .send(Message::Binary(payload))
                        .await
                        .map_err(|e| WsError::Connection(Arc::new(e)));
                    _ = reply.send(outcome);
                }
                Command::Close => {
                    if closing.swap(true, Ordering::SeqCst) {
                        continue;
                    }
                    let frame = CloseFrame {
                        code: CloseCode::Away,
                        reason: config.close_reason.clone().unwrap_or_default().into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(error = %e, "Close frame could not be sent");
                        #[cfg(not(feature = "tracing"))]
                        let _ = &e;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl SocketTransport for ConnectionManager {
    fn subscribe(&self) -> BoxStream<'static, InboundEvent> {
        ConnectionManager::subscribe(self).boxed()
    }

    async fn send(&self, payload: Bytes) -> Result<(), WsError> {
        ConnectionManager::send(self, payload).await
    }

    fn close(&self) {
        ConnectionManager::close(self);
    }
}
