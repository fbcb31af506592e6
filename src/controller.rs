//! The liveview session state machine: begin → poll → stream → stop (§4.4).

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::rest::{CommandHandle, RestClient, SessionRequest};
use crate::sink::ByteSink;
use crate::stream;
use crate::wire::parse_session_descriptor;

/// Coordinates the REST command lifecycle and the TLS stream client for a
/// single camera. Owns nothing across calls to [`Controller::run`]; a fresh
/// run is a fresh state machine.
#[derive(Clone)]
pub struct Controller {
    rest: RestClient,
}

impl Controller {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Runs one liveview session end to end. Returns once the sink will
    /// receive no further bytes -- callers must not assume anything about
    /// the sink's state beyond that point.
    ///
    /// Begin-liveview and descriptor-parse failures are reported before any
    /// stop-command is attempted, per the controller's failure semantics:
    /// those two steps precede any vendor-side effect this controller is
    /// responsible for unwinding.
    pub async fn run(
        &self,
        request: SessionRequest,
        sink: &mut dyn ByteSink,
        cancel: CancellationToken,
    ) -> Result<(), GatewayError> {
        let descriptor = self.rest.begin_liveview(&request).await?;
        info!(command_id = descriptor.command_id, "liveview session begun");

        let handle = CommandHandle {
            command_id: descriptor.command_id,
            network_id: request.account.network_id,
            token: request.token.clone(),
            base_url: request.base_url(),
            polling_interval: descriptor.polling_interval.max(1) as u64,
        };

        let poller_token = cancel.child_token();
        let poller = {
            let rest = self.rest.clone();
            let handle = handle.clone();
            let token = poller_token.clone();
            tokio::spawn(async move {
                if let Err(err) = rest.poll_command(&handle, token).await {
                    warn!(command_id = handle.command_id, %err, "poller exited with error; stream continues");
                }
            })
        };

        let endpoint = match parse_session_descriptor(&descriptor.server) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                poller_token.cancel();
                let _ = poller.await;
                return Err(err);
            }
        };

        let result = stream::run(&endpoint, sink, cancel).await;

        poller_token.cancel();
        let _ = poller.await;
        self.stop_command_best_effort(&handle).await;

        result
    }

    async fn stop_command_best_effort(&self, handle: &CommandHandle) {
        if let Err(err) = self.rest.stop_command(handle).await {
            warn!(command_id = handle.command_id, %err, "stop-command failed; original exit reason preserved");
        }
    }
}
