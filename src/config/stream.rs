//! `streamSettings` of the kernel document.
//!
//! The security block sits next to the transport block: `tlsSettings` or
//! `xtlsSettings` is a sibling of `tcpSettings`/`wsSettings`/..., never nested
//! inside it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::util::{is_false, is_zero_u32};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamSettingsObject {
    pub network: String,

    pub security: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_settings: Option<TlsObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xtls_settings: Option<TlsObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_settings: Option<TcpObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kcp_settings: Option<KcpObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_settings: Option<WsObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_settings: Option<HttpObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quic_settings: Option<QuicObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ds_settings: Option<DomainSocketObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_settings: Option<GrpcObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sockopt: Option<SockoptObject>,
}

// ============================================================================
// Transports
// ============================================================================

/// Header obfuscation block shared by TCP, mKCP and QUIC.
///
/// Only TCP's `http` type carries a request/response pair.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HeaderObject {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpRequestObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponseObject>,
}

impl HeaderObject {
    pub fn of_type(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            request: None,
            response: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpRequestObject {
    pub version: String,
    pub method: String,
    pub path: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpResponseObject {
    pub version: String,
    pub status: String,
    pub reason: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TcpObject {
    pub header: HeaderObject,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KcpObject {
    pub mtu: u32,
    pub tti: u32,
    pub uplink_capacity: u32,
    pub downlink_capacity: u32,
    pub congestion: bool,
    pub read_buffer_size: u32,
    pub write_buffer_size: u32,
    pub header: HeaderObject,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WsObject {
    pub path: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub max_early_data: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_data_header_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpObject {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,

    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuicObject {
    pub security: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    pub header: HeaderObject,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DomainSocketObject {
    pub path: String,

    #[serde(default, rename = "abstract", skip_serializing_if = "is_false")]
    pub abstract_socket: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub padding: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrpcObject {
    pub service_name: String,
}

// ============================================================================
// Security / Socket Options
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_insecure: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_session_resumption: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_system_root: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<CertificateObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateObject {
    pub usage: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SockoptObject {
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub mark: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_fast_open: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tproxy: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_security_is_sibling_of_transport() {
        let stream = StreamSettingsObject {
            network: "ws".to_string(),
            security: "tls".to_string(),
            tls_settings: Some(TlsObject {
                server_name: Some("example.com".to_string()),
                ..Default::default()
            }),
            ws_settings: Some(WsObject {
                path: "/ray".to_string(),
                headers: BTreeMap::new(),
                max_early_data: 0,
                early_data_header_name: None,
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&stream).unwrap();
        assert_eq!(
            value,
            json!({
                "network": "ws",
                "security": "tls",
                "tlsSettings": {"serverName": "example.com"},
                "wsSettings": {"path": "/ray"}
            })
        );
    }

    #[test]
    fn test_header_type_field_name() {
        let header = HeaderObject::of_type("wechat-video");
        assert_eq!(
            serde_json::to_value(&header).unwrap(),
            json!({"type": "wechat-video"})
        );
    }

    #[test]
    fn test_domain_socket_abstract_flag() {
        let ds = DomainSocketObject {
            path: "/run/ray.sock".to_string(),
            abstract_socket: true,
            padding: false,
        };
        assert_eq!(
            serde_json::to_value(&ds).unwrap(),
            json!({"path": "/run/ray.sock", "abstract": true})
        );
    }
}
