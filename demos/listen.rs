//! Subscribes to a chat endpoint and logs every decoded message.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info cargo run --example listen --features tracing -- ws://127.0.0.1:8080/ws
//! ```

use futures::StreamExt as _;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use websocket_chat_client::chat::Client;
use websocket_chat_client::ws::config::Config;

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    message_text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8080/ws".to_owned());

    let client: Client<ChatMessage, ChatMessage> = Client::new(&endpoint, Config::default())?;
    info!(%endpoint, "subscribing to chat stream");

    let mut stream = Box::pin(client.subscribe());

    while let Some(event) = stream.next().await {
        match event {
            Ok(message) => info!(text = %message.message_text, "message"),
            Err(e) => error!(error = %e, "stream error"),
        }
    }

    Ok(())
}
