//! The REST command client: begin-liveview, poll-command, stop-command (§4.2).

pub mod client;
pub mod types;

pub use client::RestClient;
pub use types::{AccountRef, CommandHandle, DeviceKind, SessionDescriptor, SessionRequest};
