//! Core WebSocket infrastructure.
//!
//! This module turns one callback-driven socket connection into a
//! continuous, multicast event stream plus typed send and close operations.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: owns one socket connection and republishes every
//!   inbound frame (or receive failure) on a broadcast channel
//! - [`SocketTransport`]: capability trait the typed client consumes, so
//!   test doubles and custom transports can stand in for a real socket
//!
//! # Example
//!
//! ```ignore
//! let connection = ConnectionManager::new(endpoint, Config::default())?;
//! let mut events = Box::pin(connection.subscribe());
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod traits;

pub use connection::{ConnectionManager, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use traits::*;
