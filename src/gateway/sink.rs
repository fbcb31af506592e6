//! WebSocket binary writer satisfying the controller's `ByteSink` contract (§9).

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::sink::ByteSink;

/// The writer half is shared between the streaming path and protocol
/// acknowledgments (§5), so every write is serialized through this mutex
/// rather than split further.
#[derive(Clone)]
pub struct WebSocketSink {
    writer: Arc<Mutex<SplitSink<WebSocket, Message>>>,
}

impl WebSocketSink {
    pub fn new(writer: Arc<Mutex<SplitSink<WebSocket, Message>>>) -> Self {
        Self { writer }
    }

    pub async fn send_text(&self, text: String) -> Result<(), GatewayError> {
        self.writer
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| GatewayError::SinkWrite(e.to_string()))
    }
}

#[async_trait]
impl ByteSink for WebSocketSink {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), GatewayError> {
        self.writer
            .lock()
            .await
            .send(Message::Binary(chunk.to_vec()))
            .await
            .map_err(|e| GatewayError::SinkWrite(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.writer.lock().await.close().await;
    }
}
