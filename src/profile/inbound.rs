//! Inbound definitions: HTTP, SOCKS and dokodemo-door listeners.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::util::{is_false, is_zero_u32};
use crate::profile::outbound::Account;
use crate::profile::routing::Network;
use crate::profile::stream::StreamSettings;

// ============================================================================
// Inbound Definition
// ============================================================================

/// One listener of a profile. `name` is the tag rules match on.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InboundDefinition {
    pub name: String,

    pub listen_address: String,

    pub listen_port: u16,

    #[serde(default)]
    pub sniffing: Sniffing,

    #[serde(flatten)]
    pub settings: InboundSettings,

    #[serde(default)]
    pub stream: StreamSettings,
}

impl InboundDefinition {
    pub fn new(
        name: impl Into<String>,
        listen_address: impl Into<String>,
        listen_port: u16,
        settings: InboundSettings,
    ) -> Self {
        Self {
            name: name.into(),
            listen_address: listen_address.into(),
            listen_port,
            sniffing: Sniffing::default(),
            settings,
            stream: StreamSettings::default(),
        }
    }

    pub fn with_sniffing(mut self, sniffing: Sniffing) -> Self {
        self.sniffing = sniffing;
        self
    }

    pub fn with_stream(mut self, stream: StreamSettings) -> Self {
        self.stream = stream;
        self
    }

    /// Whether this listener accepts UDP traffic.
    pub fn accepts_udp(&self) -> bool {
        match &self.settings {
            InboundSettings::Socks(socks) => socks.udp,
            InboundSettings::DokodemoDoor(door) => door.network.contains(&Network::Udp),
            InboundSettings::Http(_) | InboundSettings::Unsupported { .. } => false,
        }
    }
}

// ============================================================================
// Sniffing
// ============================================================================

/// Protocols whose sniffed destination may override the connection target.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SniffProtocol {
    Http,
    Tls,
    Fakedns,
    #[serde(rename = "fakedns+others")]
    FakednsOthers,
}

impl SniffProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Tls => "tls",
            Self::Fakedns => "fakedns",
            Self::FakednsOthers => "fakedns+others",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Sniffing {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub metadata_only: bool,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub destination_override: BTreeSet<SniffProtocol>,
}

impl Sniffing {
    /// Sniff HTTP and TLS, the usual setting for local proxies.
    pub fn http_tls() -> Self {
        Self {
            enabled: true,
            metadata_only: false,
            destination_override: [SniffProtocol::Http, SniffProtocol::Tls].into(),
        }
    }
}

// ============================================================================
// Protocol Settings
// ============================================================================

/// Protocol-specific inbound settings.
///
/// Serialized as `protocol` plus `settings`. Protocols the kernel cannot
/// listen with are kept as [`InboundSettings::Unsupported`] so that the
/// generator can reject them explicitly.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "RawInboundSettings", into = "RawInboundSettings")]
pub enum InboundSettings {
    Http(HttpInboundSettings),
    Socks(SocksInboundSettings),
    DokodemoDoor(DokodemoDoorSettings),
    Unsupported { protocol: String, settings: Value },
}

impl InboundSettings {
    pub fn protocol(&self) -> &str {
        match self {
            Self::Http(_) => "http",
            Self::Socks(_) => "socks",
            Self::DokodemoDoor(_) => "dokodemo-door",
            Self::Unsupported { protocol, .. } => protocol,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct RawInboundSettings {
    protocol: String,

    #[serde(default)]
    settings: Value,
}

impl TryFrom<RawInboundSettings> for InboundSettings {
    type Error = serde_json::Error;

    fn try_from(raw: RawInboundSettings) -> Result<Self, Self::Error> {
        let settings = if raw.settings.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            raw.settings
        };

        Ok(match raw.protocol.as_str() {
            "http" => Self::Http(serde_json::from_value(settings)?),
            "socks" => Self::Socks(serde_json::from_value(settings)?),
            "dokodemo-door" => Self::DokodemoDoor(serde_json::from_value(settings)?),
            _ => Self::Unsupported {
                protocol: raw.protocol,
                settings,
            },
        })
    }
}

impl From<InboundSettings> for RawInboundSettings {
    fn from(settings: InboundSettings) -> Self {
        let protocol = settings.protocol().to_string();
        let settings = match settings {
            InboundSettings::Http(s) => serde_json::to_value(s),
            InboundSettings::Socks(s) => serde_json::to_value(s),
            InboundSettings::DokodemoDoor(s) => serde_json::to_value(s),
            InboundSettings::Unsupported { settings, .. } => Ok(settings),
        }
        .unwrap_or(Value::Null);
        Self { protocol, settings }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HttpInboundSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Account>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_transparent: bool,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub user_level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SocksInboundSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Account>,

    #[serde(default)]
    pub udp: bool,

    /// Local address announced to clients for UDP associate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub user_level: u32,
}

impl SocksInboundSettings {
    /// `password` when accounts are configured, `noauth` otherwise.
    pub fn auth(&self) -> &'static str {
        if self.accounts.is_empty() {
            "noauth"
        } else {
            "password"
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DokodemoDoorSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default)]
    pub network: BTreeSet<Network>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub follow_redirect: bool,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub user_level: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_json_shape() {
        let inbound = InboundDefinition::new(
            "http-in",
            "127.0.0.1",
            8080,
            InboundSettings::Http(HttpInboundSettings::default()),
        )
        .with_sniffing(Sniffing::http_tls());

        let json = serde_json::to_value(&inbound).unwrap();
        assert_eq!(json["protocol"], "http");
        assert!(json["settings"].is_object());
        assert_eq!(json["sniffing"]["destination_override"][0], "http");
        assert_eq!(json["sniffing"]["destination_override"][1], "tls");
    }

    #[test]
    fn test_unknown_protocol_is_kept() {
        let json = r#"{
            "name": "odd",
            "listen_address": "0.0.0.0",
            "listen_port": 9000,
            "protocol": "vmess",
            "settings": {"clients": []}
        }"#;
        let inbound: InboundDefinition = serde_json::from_str(json).unwrap();
        match &inbound.settings {
            InboundSettings::Unsupported { protocol, .. } => assert_eq!(protocol, "vmess"),
            other => panic!("Expected unsupported inbound, got {:?}", other),
        }
        assert!(!inbound.accepts_udp());
    }

    #[test]
    fn test_missing_settings_take_defaults() {
        let json = r#"{
            "name": "socks-in",
            "listen_address": "127.0.0.1",
            "listen_port": 1080,
            "protocol": "socks"
        }"#;
        let inbound: InboundDefinition = serde_json::from_str(json).unwrap();
        let InboundSettings::Socks(socks) = &inbound.settings else {
            panic!("Expected SOCKS settings");
        };
        assert!(!socks.udp);
        assert_eq!(socks.auth(), "noauth");
    }

    #[test]
    fn test_dokodemo_udp_detection() {
        let door = DokodemoDoorSettings {
            network: [Network::Tcp, Network::Udp].into(),
            follow_redirect: true,
            ..Default::default()
        };
        let inbound =
            InboundDefinition::new("tproxy-in", "0.0.0.0", 12345, InboundSettings::DokodemoDoor(door));
        assert!(inbound.accepts_udp());
    }

    #[test]
    fn test_sniff_protocol_names() {
        let json = serde_json::to_string(&SniffProtocol::FakednsOthers).unwrap();
        assert_eq!(json, r#""fakedns+others""#);
    }
}
