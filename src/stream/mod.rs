//! TLS dial, authentication handshake and byte-forwarding loop (§4.3).

pub mod tls_client;

pub use tls_client::{run, run_with_deadlines, Deadlines};
