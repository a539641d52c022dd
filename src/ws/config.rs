#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

/// Buffer size of the broadcast channel between the receive loop and subscribers.
const DEFAULT_MESSAGE_BUFFER: usize = 1024;

/// Configuration for WebSocket client behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of inbound events buffered per subscriber. The receive loop is
    /// push-based and does not wait for consumers; a subscriber that falls
    /// further behind than this observes a lag event instead of the missed
    /// messages.
    pub message_buffer: usize,
    /// Optional reason string attached to the close frame sent on a local
    /// close. `None` sends an empty reason.
    pub close_reason: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            message_buffer: DEFAULT_MESSAGE_BUFFER,
            close_reason: None,
        }
    }
}
