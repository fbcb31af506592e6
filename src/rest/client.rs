//! Typed operations over the vendor REST API (§4.2, §6).

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::GatewayError;

use super::types::{CommandHandle, CommandResponse, SessionDescriptor, SessionRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A thin REST client carrying the vendor's fixed header set (§4.2).
///
/// Cloning is cheap: `reqwest::Client` is an `Arc` around a shared connection pool.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RestClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client configuration is valid");
        Self { http }
    }

    fn headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("app-build", HeaderValue::from_static("ANDROID_28799573"));
        headers.insert("user-agent", HeaderValue::from_static("37.0ANDROID_28799573"));
        headers.insert("locale", HeaderValue::from_static("en_US"));
        headers.insert("x-blink-time-zone", HeaderValue::from_static("America/New_York"));
        if let Ok(value) = HeaderValue::from_str(token) {
            headers.insert("token-auth", value);
        }
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/json; charset=UTF-8"),
        );
        headers
    }

    /// Begins a liveview session for the camera named by `request`.
    pub async fn begin_liveview(&self, request: &SessionRequest) -> Result<SessionDescriptor, GatewayError> {
        self.begin_liveview_at(&request.base_url(), request).await
    }

    /// As [`Self::begin_liveview`], but against an explicit base URL. Lets
    /// tests point the client at a local mock server without touching
    /// `SessionRequest::base_url`'s region-to-host mapping.
    async fn begin_liveview_at(
        &self,
        base_url: &str,
        request: &SessionRequest,
    ) -> Result<SessionDescriptor, GatewayError> {
        let path = request.account.device_kind.begin_liveview_path(
            request.account.account_id,
            request.account.network_id,
            request.account.camera_id,
        );
        let url = format!("{base_url}/{path}");

        let response = self
            .http
            .post(&url)
            .headers(Self::headers(&request.token))
            .json(&serde_json::json!({ "intent": "liveview" }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(GatewayError::Protocol(format!(
                "error starting liveview. HTTP Status Code {status}"
            )));
        }

        let descriptor: SessionDescriptor = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(format!("malformed liveview response: {e}")))?;

        if descriptor.command_id == 0 {
            return Err(GatewayError::Protocol(
                "error sending liveview command: command_id is zero".to_string(),
            ));
        }

        Ok(descriptor)
    }

    /// Polls the command resource at `handle.polling_interval` cadence until
    /// cancellation, a non-200 status, or a `complete: true` response.
    ///
    /// A `complete: true` response is itself treated as a terminating failure
    /// of the poller per §4.2 -- the remote considers the command done. This
    /// preserves the upstream implementation's behavior (§9 open questions).
    pub async fn poll_command(&self, handle: &CommandHandle, cancel: CancellationToken) -> Result<(), GatewayError> {
        let url = format!(
            "{}/network/{}/command/{}",
            handle.base_url, handle.network_id, handle.command_id
        );
        let mut ticker = tokio::time::interval(Duration::from_secs(handle.polling_interval.max(1)));
        ticker.tick().await; // first tick fires immediately; consume it before polling

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(command_id = handle.command_id, "poller cancelled");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let response = self
                        .http
                        .get(&url)
                        .headers(Self::headers(&handle.token))
                        .send()
                        .await?;

                    let status = response.status();
                    if status.as_u16() != 200 {
                        return Err(GatewayError::Protocol(format!(
                            "error polling command. HTTP Status Code {status}"
                        )));
                    }

                    let result: CommandResponse = response
                        .json()
                        .await
                        .map_err(|e| GatewayError::Protocol(format!("malformed poll response: {e}")))?;

                    if result.complete {
                        return Err(GatewayError::Protocol(
                            "command marked as complete. Cannot poll further".to_string(),
                        ));
                    }
                }
            }
        }
    }

    /// Marks the liveview command as done. Called on every controller exit
    /// path (§4.4); callers are expected to log, not propagate, failures.
    pub async fn stop_command(&self, handle: &CommandHandle) -> Result<(), GatewayError> {
        let url = format!(
            "{}/network/{}/command/{}/done",
            handle.base_url, handle.network_id, handle.command_id
        );

        let response = self
            .http
            .post(&url)
            .headers(Self::headers(&handle.token))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(GatewayError::Protocol(format!(
                "cannot stop command. HTTP Status Code {status}"
            )));
        }

        let result: CommandResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(format!("malformed stop response: {e}")))?;

        if result.code != 902 {
            let message = format!(
                "cannot stop command. API Code {} with message {}",
                result.code, result.message
            );
            warn!(command_id = handle.command_id, %message, "stop-command returned a non-success code");
            return Err(GatewayError::Protocol(message));
        }

        Ok(())
    }
}
