//! Inbound objects of the kernel document.

use serde::{Deserialize, Serialize};

use crate::config::stream::StreamSettingsObject;
use crate::config::util::{is_false, is_zero_u32};

/// One listener.
///
/// Protocol-specific fields are written as `protocol` plus `settings`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundObject {
    pub tag: String,

    pub listen: String,

    pub port: u16,

    #[serde(flatten)]
    pub settings: InboundProtocolSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sniffing: Option<SniffingObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<StreamSettingsObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "protocol", content = "settings")]
pub enum InboundProtocolSettings {
    #[serde(rename = "http")]
    Http(HttpInboundObject),
    #[serde(rename = "socks")]
    Socks(SocksInboundObject),
    #[serde(rename = "dokodemo-door")]
    DokodemoDoor(DokodemoDoorObject),
}

impl InboundProtocolSettings {
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Socks(_) => "socks",
            Self::DokodemoDoor(_) => "dokodemo-door",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SniffingObject {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dest_override: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub metadata_only: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountObject {
    pub user: String,
    pub pass: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpInboundObject {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<AccountObject>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_transparent: bool,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub user_level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocksInboundObject {
    /// `noauth` or `password`.
    pub auth: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<AccountObject>,

    #[serde(default)]
    pub udp: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub user_level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DokodemoDoorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Comma-separated, e.g. `tcp,udp`.
    pub network: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub follow_redirect: bool,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub user_level: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_protocol_and_settings_are_siblings() {
        let inbound = InboundObject {
            tag: "socks-in".to_string(),
            listen: "127.0.0.1".to_string(),
            port: 1089,
            settings: InboundProtocolSettings::Socks(SocksInboundObject {
                auth: "noauth".to_string(),
                udp: true,
                ..Default::default()
            }),
            sniffing: None,
            stream_settings: None,
        };

        assert_eq!(
            serde_json::to_value(&inbound).unwrap(),
            json!({
                "tag": "socks-in",
                "listen": "127.0.0.1",
                "port": 1089,
                "protocol": "socks",
                "settings": {"auth": "noauth", "udp": true}
            })
        );
    }

    #[test]
    fn test_dokodemo_protocol_name() {
        let settings = InboundProtocolSettings::DokodemoDoor(DokodemoDoorObject {
            network: "tcp,udp".to_string(),
            follow_redirect: true,
            ..Default::default()
        });
        assert_eq!(settings.protocol(), "dokodemo-door");
        assert_eq!(
            serde_json::to_value(&settings).unwrap(),
            json!({
                "protocol": "dokodemo-door",
                "settings": {"network": "tcp,udp", "followRedirect": true}
            })
        );
    }

    #[test]
    fn test_sniffing_names() {
        let sniffing = SniffingObject {
            enabled: true,
            dest_override: vec!["http".to_string(), "tls".to_string()],
            metadata_only: false,
        };
        assert_eq!(
            serde_json::to_value(&sniffing).unwrap(),
            json!({"enabled": true, "destOverride": ["http", "tls"]})
        );
    }
}
