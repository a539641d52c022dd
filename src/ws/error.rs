#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// WebSocket error variants.
///
/// Carried as stream values through the broadcast channel, so every variant
/// is cheap to clone.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum WsError {
    /// The remote side closed the session with the given close code
    SessionClosed(CloseCode),
    /// Received a frame kind this client does not handle
    UnknownFrame,
    /// Error connecting to or communicating with the WebSocket server
    Connection(Arc<tungstenite::Error>),
    /// The connection was closed before the operation could complete
    ConnectionClosed,
    /// Subscriber stream lagged behind the receive loop and missed events
    Lagged {
        /// Number of events that were missed
        count: u64,
    },
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionClosed(code) => {
                write!(f, "session closed by remote with code {}", u16::from(*code))
            }
            Self::UnknownFrame => write!(f, "received an unrecognized frame kind"),
            Self::Connection(e) => write!(f, "WebSocket connection error: {e}"),
            Self::ConnectionClosed => write!(f, "WebSocket connection closed"),
            Self::Lagged { count } => write!(f, "subscriber lagged, missed {count} events"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, e)
    }
}

impl From<tungstenite::Error> for crate::error::Error {
    fn from(e: tungstenite::Error) -> Self {
        crate::error::Error::with_source(
            crate::error::Kind::WebSocket,
            WsError::Connection(Arc::new(e)),
        )
    }
}
