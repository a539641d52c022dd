//! Sends one message to an echo endpoint and logs what comes back.
//!
//! Payloads that do not decode as `ChatMessage` (e.g. a server greeting)
//! show up as decode errors without ending the stream.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info cargo run --example echo --features tracing -- wss://echo.websocket.org
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
        .unwrap_or_else(|| "wss://echo.websocket.org".to_owned());

    let client: Client<ChatMessage, ChatMessage> = Client::new(&endpoint, Config::default())?;
    let mut stream = Box::pin(client.subscribe());

    client
        .send(&ChatMessage {
            message_text: "hello".to_owned(),
        })
        .await?;
    info!(%endpoint, "message sent, waiting for echo");

    while let Some(event) = stream.next().await {
        match event {
            Ok(message) => info!(text = %message.message_text, "echo"),
            Err(e) => error!(error = %e, "stream error"),
        }
    }

    Ok(())
}
