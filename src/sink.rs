//! The byte sink capability consumed by the streaming path (§9 "Sink polymorphism").
//!
//! Modeled as two capabilities -- write a chunk, which may fail, and close --
//! rather than a type hierarchy, so a child-process pipe and a WebSocket
//! writer can both satisfy it by composition.

use async_trait::async_trait;

use crate::error::GatewayError;

/// Something that can accept produced stream bytes and eventually be closed.
///
/// Implementors must treat a write failure as fatal: the TLS read/forward
/// loop (§4.3) stops on the first `Err` returned here.
#[async_trait]
pub trait ByteSink: Send {
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), GatewayError>;

    async fn close(&mut self);
}
