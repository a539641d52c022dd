//! Core traits for generic WebSocket infrastructure.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_tungstenite::tungstenite::Bytes;

use super::error::WsError;

/// One inbound event from the socket: a frame payload or a transport failure.
///
/// Payload bytes are optional to mirror transports that can deliver a frame
/// with no byte content. The typed layer treats an absent payload as a decode
/// failure, not a transport failure.
pub type InboundEvent = Result<Option<Bytes>, WsError>;

/// Capability interface over one bidirectional socket connection.
///
/// [`ConnectionManager`](super::ConnectionManager) is the production
/// implementation; test doubles implement this trait to script inbound
/// events and observe outbound sends.
///
/// # Example
///
/// ```ignore
/// struct RecordingTransport { /* ... */ }
///
/// #[async_trait]
/// impl SocketTransport for RecordingTransport {
///     fn subscribe(&self) -> BoxStream<'static, InboundEvent> { /* ... */ }
///     async fn send(&self, payload: Bytes) -> Result<(), WsError> { /* ... */ }
///     fn close(&self) { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait SocketTransport: Send + Sync + 'static {
    /// Start the connection if it has not been started yet and return the
    /// stream of inbound events.
    ///
    /// Every call returns an independent stream onto the same event
    /// sequence; calling more than once never restarts the connection.
    fn subscribe(&self) -> BoxStream<'static, InboundEvent>;

    /// Transmit one binary frame, resolving once the transport acknowledges
    /// or rejects the write.
    async fn send(&self, payload: Bytes) -> Result<(), WsError>;

    /// Initiate a graceful shutdown. Idempotent.
    fn close(&self);
}
