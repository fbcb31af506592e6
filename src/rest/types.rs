//! Typed request/response shapes for the REST command client (§3, §6).

use crate::error::GatewayError;
use serde::Deserialize;

/// A device kind, used to select the begin-liveview path template (§4.2, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Camera,
    Owl,
    Doorbell,
}

impl DeviceKind {
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        match raw {
            "camera" => Ok(DeviceKind::Camera),
            "owl" | "hawk" => Ok(DeviceKind::Owl),
            "doorbell" | "lotus" => Ok(DeviceKind::Doorbell),
            other => Err(GatewayError::UnsupportedDeviceKind(other.to_string())),
        }
    }

    pub fn begin_liveview_path(&self, account_id: u64, network_id: u64, camera_id: u64) -> String {
        match self {
            DeviceKind::Camera => format!(
                "api/v5/accounts/{account_id}/networks/{network_id}/cameras/{camera_id}/liveview"
            ),
            DeviceKind::Owl => format!(
                "api/v2/accounts/{account_id}/networks/{network_id}/owls/{camera_id}/liveview"
            ),
            DeviceKind::Doorbell => format!(
                "api/v2/accounts/{account_id}/networks/{network_id}/doorbells/{camera_id}/liveview"
            ),
        }
    }
}

/// Identifies the account/network/camera a liveview session is requested for (§3).
#[derive(Debug, Clone)]
pub struct AccountRef {
    pub account_id: u64,
    pub network_id: u64,
    pub camera_id: u64,
    pub device_kind: DeviceKind,
}

/// One controller run's worth of credentials and targeting (§3).
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub account: AccountRef,
    pub token: String,
    pub region: String,
    /// Never set by the subscriber protocol (§4.5); exists purely so tests
    /// can point a full `Controller::run` at a local mock REST server
    /// instead of the real `rest-<region>.immedia-semi.com` host.
    pub base_url_override: Option<String>,
}

impl SessionRequest {
    pub fn base_url(&self) -> String {
        if let Some(base_url) = &self.base_url_override {
            return base_url.clone();
        }
        let region = if self.region.is_empty() { "prod" } else { &self.region };
        format!("https://rest-{region}.immedia-semi.com")
    }
}

/// The JSON document returned by begin-liveview (§3, §4.2).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionDescriptor {
    pub command_id: i64,
    pub polling_interval: i64,
    pub server: String,
}

/// What the controller needs to keep polling and eventually stop a command (§3).
#[derive(Debug, Clone)]
pub struct CommandHandle {
    pub command_id: i64,
    pub network_id: u64,
    pub token: String,
    pub base_url: String,
    pub polling_interval: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommandResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_kind_maps_aliases() {
        assert_eq!(DeviceKind::parse("owl").unwrap(), DeviceKind::Owl);
        assert_eq!(DeviceKind::parse("hawk").unwrap(), DeviceKind::Owl);
        assert_eq!(DeviceKind::parse("doorbell").unwrap(), DeviceKind::Doorbell);
        assert_eq!(DeviceKind::parse("lotus").unwrap(), DeviceKind::Doorbell);
        assert_eq!(DeviceKind::parse("camera").unwrap(), DeviceKind::Camera);
    }

    #[test]
    fn unknown_device_kind_is_rejected() {
        let err = DeviceKind::parse("toaster").unwrap_err();
        assert_eq!(err.to_string(), "cannot build path for unknown device type: toaster");
    }

    #[test]
    fn camera_path_uses_v5() {
        let path = DeviceKind::Camera.begin_liveview_path(1, 2, 3);
        assert_eq!(path, "api/v5/accounts/1/networks/2/cameras/3/liveview");
    }

    #[test]
    fn owl_path_uses_v2() {
        let path = DeviceKind::Owl.begin_liveview_path(1, 2, 3);
        assert_eq!(path, "api/v2/accounts/1/networks/2/owls/3/liveview");
    }

    #[test]
    fn base_url_defaults_to_prod() {
        let req = SessionRequest {
            account: AccountRef {
                account_id: 1,
                network_id: 1,
                camera_id: 1,
                device_kind: DeviceKind::Camera,
            },
            token: "tok".to_string(),
            region: String::new(),
            base_url_override: None,
        };
        assert_eq!(req.base_url(), "https://rest-prod.immedia-semi.com");
    }

    #[test]
    fn base_url_uses_region() {
        let req = SessionRequest {
            account: AccountRef {
                account_id: 1,
                network_id: 1,
                camera_id: 1,
                device_kind: DeviceKind::Camera,
            },
            token: "tok".to_string(),
            region: "u011".to_string(),
            base_url_override: None,
        };
        assert_eq!(req.base_url(), "https://rest-u011.immedia-semi.com");
    }
}
