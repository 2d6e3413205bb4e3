//! Outbound objects of the kernel document.

use serde::{Deserialize, Serialize};

use crate::config::inbound::AccountObject;
use crate::config::stream::StreamSettingsObject;
use crate::config::util::is_zero_u32;

// ============================================================================
// Outbound Object
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundObject {
    pub tag: String,

    #[serde(flatten)]
    pub settings: OutboundProtocolSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<StreamSettingsObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mux: Option<MuxObject>,
}

/// Written only when multiplexing is enabled.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MuxObject {
    pub enabled: bool,
    pub concurrency: u32,
}

/// Protocol plus its `settings` block.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "protocol", content = "settings", rename_all = "lowercase")]
pub enum OutboundProtocolSettings {
    Http(ServerListObject),
    Socks(ServerListObject),
    Shadowsocks(ShadowsocksObject),
    #[serde(rename = "vmess")]
    VMess(VMessObject),
    #[serde(rename = "vless")]
    VLess(VLessObject),
    Freedom(FreedomObject),
    Blackhole(BlackholeObject),
    Dns(DnsOutboundObject),
    Loopback(LoopbackObject),
}

impl OutboundProtocolSettings {
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Socks(_) => "socks",
            Self::Shadowsocks(_) => "shadowsocks",
            Self::VMess(_) => "vmess",
            Self::VLess(_) => "vless",
            Self::Freedom(_) => "freedom",
            Self::Blackhole(_) => "blackhole",
            Self::Dns(_) => "dns",
            Self::Loopback(_) => "loopback",
        }
    }
}

// ============================================================================
// Proxy Protocols
// ============================================================================

/// `servers` list used by the HTTP and SOCKS clients.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ServerListObject {
    pub servers: Vec<ServerObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ServerObject {
    pub address: String,
    pub port: u16,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<AccountObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ShadowsocksObject {
    pub servers: Vec<ShadowsocksServerObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ShadowsocksServerObject {
    pub address: String,
    pub port: u16,
    pub method: String,
    pub password: String,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VMessObject {
    pub vnext: Vec<VMessServerObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VMessServerObject {
    pub address: String,
    pub port: u16,
    pub users: Vec<VMessUserObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VMessUserObject {
    pub id: String,
    pub alter_id: u32,
    pub security: String,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VLessObject {
    pub vnext: Vec<VLessServerObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VLessServerObject {
    pub address: String,
    pub port: u16,
    pub users: Vec<VLessUserObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VLessUserObject {
    pub id: String,
    pub encryption: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub level: u32,
}

// ============================================================================
// Built-in Outbounds
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreedomObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_strategy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BlackholeObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BlackholeResponseObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BlackholeResponseObject {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DnsOutboundObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoopbackObject {
    pub inbound_tag: String,
}
