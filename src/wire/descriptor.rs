//! Session descriptor URL parsing (§4.1, §8 P6).
//!
//! Pure: the same `server` string always yields the same `StreamEndpoint`
//! or the same error.

use crate::error::GatewayError;
use url::Url;

/// The parsed form of a begin-liveview response's `server` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    pub host: String,
    pub port: u16,
    pub conn_id: String,
    pub client_id: u32,
}

/// Parses a vendor `server` URL of the form
/// `<scheme>://<host>:<port>/<connId>_<suffix>?client_id=<int>`.
pub fn parse_session_descriptor(server: &str) -> Result<StreamEndpoint, GatewayError> {
    let url = Url::parse(server).map_err(|e| GatewayError::Descriptor(e.to_string()))?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| GatewayError::Descriptor("invalid host".to_string()))?
        .to_string();

    let port = url
        .port()
        .ok_or_else(|| GatewayError::Descriptor("missing port".to_string()))?;
    if port != 443 {
        return Err(GatewayError::Descriptor(format!(
            "unexpected port {port}. Expecting 443"
        )));
    }

    let last_segment = url
        .path_segments()
        .and_then(|mut segs| segs.next_back())
        .unwrap_or("");

    let conn_id = match last_segment.split_once('_') {
        Some((prefix, _suffix)) if !prefix.is_empty() => prefix.to_string(),
        _ => return Err(GatewayError::Descriptor("invalid connection ID".to_string())),
    };

    let client_id_raw = url
        .query_pairs()
        .find(|(k, _)| k == "client_id")
        .map(|(_, v)| v.into_owned());

    let client_id = match client_id_raw.as_deref() {
        Some(raw) if !raw.is_empty() => raw
            .parse::<u32>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| GatewayError::Descriptor("invalid client ID".to_string()))?,
        _ => return Err(GatewayError::Descriptor("invalid client ID".to_string())),
    };

    Ok(StreamEndpoint {
        host,
        port,
        conn_id,
        client_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let endpoint = parse_session_descriptor(
            "immis://93.93.93.93:443/Az3eugol5Zsg6J5x__IMDS_A1B2?client_id=918202",
        )
        .unwrap();
        assert_eq!(endpoint.host, "93.93.93.93");
        assert_eq!(endpoint.port, 443);
        assert_eq!(endpoint.conn_id, "Az3eugol5Zsg6J5x");
        assert_eq!(endpoint.client_id, 918202);
    }

    #[test]
    fn nominal_single_underscore_suffix() {
        let endpoint = parse_session_descriptor(
            "rtsp://3.233.10.25:443/Kz3oepxv5Jcq6T5h_SERIAL?client_id=75555",
        )
        .unwrap();
        assert_eq!(endpoint.host, "3.233.10.25");
        assert_eq!(endpoint.conn_id, "Kz3oepxv5Jcq6T5h");
        assert_eq!(endpoint.client_id, 75555);
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(parse_session_descriptor("not a url").is_err());
    }

    #[test]
    fn rejected_port() {
        let err = parse_session_descriptor(
            "immis://3.233.10.25:80/Cy5gwipn7Bui8L7z__IMDS?client_id=255",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "unexpected port 80. Expecting 443");
    }

    #[test]
    fn missing_path_is_invalid_connection_id() {
        let err = parse_session_descriptor("immis://3.233.10.25:443?client_id=255").unwrap_err();
        assert_eq!(err.to_string(), "invalid connection ID");
    }

    #[test]
    fn trailing_slash_is_invalid_connection_id() {
        let err =
            parse_session_descriptor("immis://3.233.10.25:443/XXXXXXXXX/?client_id=255").unwrap_err();
        assert_eq!(err.to_string(), "invalid connection ID");
    }

    #[test]
    fn missing_client_id() {
        let err = parse_session_descriptor(
            "immis://3.233.10.25:443/Cy5gwipn7Bui8L7z__IMDS?client_id=",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid client ID");
    }

    #[test]
    fn zero_client_id_is_rejected() {
        let err = parse_session_descriptor(
            "immis://3.233.10.25:443/Cy5gwipn7Bui8L7z__IMDS?client_id=0",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid client ID");
    }

    #[test]
    fn parsing_is_pure() {
        let input = "immis://93.93.93.93:443/Az3eugol5Zsg6J5x__IMDS_A1B2?client_id=918202";
        let a = parse_session_descriptor(input).unwrap();
        let b = parse_session_descriptor(input).unwrap();
        assert_eq!(a, b);
    }
}
