//! The subscriber command protocol: JSON frames in, typed requests out (§4.5, §9).
//!
//! The gateway boundary is where dynamically-typed subscriber input becomes
//! a typed `SessionRequest`; the controller never sees a raw JSON value.

use serde::Deserialize;

use crate::error::GatewayError;
use crate::rest::{AccountRef, DeviceKind, SessionRequest};

pub const CMD_LIVEVIEW_START: &str = "liveview:start";
pub const CMD_LIVEVIEW_STOP: &str = "liveview:stop";

/// One inbound frame on the subscriber's command channel (§4.5).
#[derive(Debug, Deserialize)]
pub struct CommandMessage {
    pub command: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct LiveviewStartData {
    #[serde(default)]
    account_region: String,
    api_token: String,
    account_id: String,
    network_id: String,
    camera_id: String,
    camera_type: String,
}

/// Parses a `liveview:start` command's `data` object into a typed session
/// request. Ids arrive from the browser as strings; any that fail to parse
/// as non-zero integers, or a `camera_type` with no mapping, fails the whole
/// command (§4.5) -- the caller closes the subscriber.
pub fn parse_liveview_start(data: &serde_json::Value) -> Result<SessionRequest, GatewayError> {
    let payload: LiveviewStartData = serde_json::from_value(data.clone())
        .map_err(|e| GatewayError::SubscriberProtocol(e.to_string()))?;

    let account_id = parse_id(&payload.account_id, "account_id")?;
    let network_id = parse_id(&payload.network_id, "network_id")?;
    let camera_id = parse_id(&payload.camera_id, "camera_id")?;
    let device_kind = DeviceKind::parse(&payload.camera_type)?;

    Ok(SessionRequest {
        account: AccountRef {
            account_id,
            network_id,
            camera_id,
            device_kind,
        },
        token: payload.api_token,
        region: payload.account_region,
        base_url_override: None,
    })
}

fn parse_id(raw: &str, field: &str) -> Result<u64, GatewayError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| GatewayError::SubscriberProtocol(format!("invalid {field}: {raw:?}")))
}

/// Builds the fixed acknowledgment/notification frames named in §6.
pub fn protocol_message(command: &str, message: &str) -> String {
    serde_json::json!({ "command": command, "data": { "message": message } }).to_string()
}
