//! The WebSocket fan-out façade: one controller per subscription (§4.5).

pub mod sink;
pub mod subscriber;
pub mod ws;

use crate::config::Config;
use crate::rest::RestClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared state handed to every subscriber connection.
///
/// `shutdown` is the process-wide root token (§4.5 "Shutdown"); every
/// subscriber's own cancellation token is a child of it, so cancelling the
/// root during the drain window propagates into every live controller
/// instead of merely stopping new WebSocket upgrades.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rest: RestClient,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Arc<Config>, rest: RestClient, shutdown: CancellationToken) -> Self {
        Self { config, rest, shutdown }
    }
}
