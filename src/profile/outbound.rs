//! Outbound definitions and their protocol-specific settings.

use serde::{Deserialize, Serialize};

use crate::config::util::is_zero_u32;
use crate::profile::stream::StreamSettings;

// ============================================================================
// Outbound Protocol Kind
// ============================================================================

/// Closed set of outbound protocols.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutboundProtocolKind {
    Http,
    Socks,
    Shadowsocks,
    VMess,
    VLess,
    Freedom,
    Blackhole,
    Dns,
    Loopback,
}

impl OutboundProtocolKind {
    /// Protocol name as the kernel spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socks => "socks",
            Self::Shadowsocks => "shadowsocks",
            Self::VMess => "vmess",
            Self::VLess => "vless",
            Self::Freedom => "freedom",
            Self::Blackhole => "blackhole",
            Self::Dns => "dns",
            Self::Loopback => "loopback",
        }
    }
}

impl std::fmt::Display for OutboundProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Outbound Definition
// ============================================================================

/// One outbound of a profile. `name` is the routing tag rules refer to.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OutboundDefinition {
    pub name: String,

    pub settings: OutboundSettings,

    #[serde(default)]
    pub stream: StreamSettings,

    #[serde(default)]
    pub mux_enabled: bool,

    #[serde(default = "default_mux_concurrency")]
    pub mux_concurrency: u32,
}

impl OutboundDefinition {
    pub fn new(name: impl Into<String>, settings: OutboundSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            stream: StreamSettings::default(),
            mux_enabled: false,
            mux_concurrency: default_mux_concurrency(),
        }
    }

    pub fn with_stream(mut self, stream: StreamSettings) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_mux(mut self, concurrency: u32) -> Self {
        self.mux_enabled = true;
        self.mux_concurrency = concurrency;
        self
    }

    pub fn protocol(&self) -> OutboundProtocolKind {
        self.settings.kind()
    }

    /// Direct connection outbound.
    pub fn freedom(name: impl Into<String>) -> Self {
        Self::new(name, OutboundSettings::Freedom(FreedomSettings::default()))
    }

    /// Outbound that drops every connection.
    pub fn blackhole(name: impl Into<String>) -> Self {
        Self::new(name, OutboundSettings::Blackhole(BlackholeSettings::default()))
    }

    /// Outbound that answers DNS queries through the kernel's resolver.
    pub fn dns(name: impl Into<String>) -> Self {
        Self::new(name, OutboundSettings::Dns(DnsOutboundSettings::default()))
    }
}

fn default_mux_concurrency() -> u32 {
    8
}

// ============================================================================
// Protocol Settings
// ============================================================================

/// Protocol-specific outbound settings, tagged by `protocol`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum OutboundSettings {
    Http(HttpClientSettings),
    Socks(SocksClientSettings),
    Shadowsocks(ShadowsocksClientSettings),
    #[serde(rename = "vmess")]
    VMess(VMessClientSettings),
    #[serde(rename = "vless")]
    VLess(VLessClientSettings),
    Freedom(FreedomSettings),
    Blackhole(BlackholeSettings),
    Dns(DnsOutboundSettings),
    Loopback(LoopbackSettings),
}

impl OutboundSettings {
    pub fn kind(&self) -> OutboundProtocolKind {
        match self {
            Self::Http(_) => OutboundProtocolKind::Http,
            Self::Socks(_) => OutboundProtocolKind::Socks,
            Self::Shadowsocks(_) => OutboundProtocolKind::Shadowsocks,
            Self::VMess(_) => OutboundProtocolKind::VMess,
            Self::VLess(_) => OutboundProtocolKind::VLess,
            Self::Freedom(_) => OutboundProtocolKind::Freedom,
            Self::Blackhole(_) => OutboundProtocolKind::Blackhole,
            Self::Dns(_) => OutboundProtocolKind::Dns,
            Self::Loopback(_) => OutboundProtocolKind::Loopback,
        }
    }
}

/// Account used by HTTP and SOCKS servers.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub user: String,
    pub pass: String,
}

impl Account {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }
}

/// HTTP or SOCKS upstream server.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AuthServer {
    pub address: String,
    pub port: u16,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<Account>,
}

impl AuthServer {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            users: Vec::new(),
        }
    }

    pub fn with_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.users.push(Account::new(user, pass));
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HttpClientSettings {
    #[serde(default)]
    pub servers: Vec<AuthServer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SocksClientSettings {
    #[serde(default)]
    pub servers: Vec<AuthServer>,
}

// ============================================================================
// Shadowsocks
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ShadowsocksClientSettings {
    #[serde(default)]
    pub servers: Vec<ShadowsocksServer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ShadowsocksServer {
    pub address: String,
    pub port: u16,
    pub method: String,
    pub password: String,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub level: u32,

    /// SIP003 plugin, carried through from links and subscriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<Sip003Plugin>,
}

impl ShadowsocksServer {
    pub fn new(
        address: impl Into<String>,
        port: u16,
        method: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            port,
            method: method.into(),
            password: password.into(),
            level: 0,
            plugin: None,
        }
    }
}

/// SIP003 plugin name and its option string.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Sip003Plugin {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub opts: String,
}

// ============================================================================
// VMess / VLESS
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VMessClientSettings {
    #[serde(default)]
    pub vnext: Vec<VMessServer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VMessServer {
    pub address: String,
    pub port: u16,

    #[serde(default)]
    pub users: Vec<VMessUser>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VMessUser {
    pub id: String,

    /// Non-zero values select the legacy MD5 authentication.
    #[serde(default)]
    pub alter_id: u32,

    #[serde(default = "default_vmess_security")]
    pub security: String,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub level: u32,
}

impl VMessUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alter_id: 0,
            security: default_vmess_security(),
            level: 0,
        }
    }
}

impl VMessClientSettings {
    pub fn new(address: impl Into<String>, port: u16, id: impl Into<String>) -> Self {
        Self {
            vnext: vec![VMessServer {
                address: address.into(),
                port,
                users: vec![VMessUser::new(id)],
            }],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VLessClientSettings {
    #[serde(default)]
    pub vnext: Vec<VLessServer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VLessServer {
    pub address: String,
    pub port: u16,

    #[serde(default)]
    pub users: Vec<VLessUser>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VLessUser {
    pub id: String,

    #[serde(default = "default_vless_encryption")]
    pub encryption: String,

    /// Only meaningful under XTLS.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flow: String,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub level: u32,
}

impl VLessUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            encryption: default_vless_encryption(),
            flow: String::new(),
            level: 0,
        }
    }
}

impl VLessClientSettings {
    pub fn new(address: impl Into<String>, port: u16, id: impl Into<String>) -> Self {
        Self {
            vnext: vec![VLessServer {
                address: address.into(),
                port,
                users: vec![VLessUser::new(id)],
            }],
        }
    }
}

fn default_vmess_security() -> String {
    "auto".to_string()
}

fn default_vless_encryption() -> String {
    "none".to_string()
}

// ============================================================================
// Endpoint-less Outbounds
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FreedomSettings {
    /// AsIs, UseIP, UseIPv4 or UseIPv6.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_strategy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BlackholeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BlackholeResponse>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlackholeResponse {
    None,
    Http,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DnsOutboundSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LoopbackSettings {
    pub inbound_tag: String,
}

// ============================================================================
// Endpoint Accessors
// ============================================================================

/// Address and port of an outbound's first server.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboundInfo {
    pub address: String,
    pub port: u16,
}

impl OutboundInfo {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

/// Reads `{address, port}` from the first server/vnext entry.
///
/// Returns `None` for protocols without an endpoint or with an empty list.
pub fn get_outbound_info(settings: &OutboundSettings) -> Option<OutboundInfo> {
    let (address, port) = match settings {
        OutboundSettings::Http(s) => s.servers.first().map(|x| (&x.address, x.port))?,
        OutboundSettings::Socks(s) => s.servers.first().map(|x| (&x.address, x.port))?,
        OutboundSettings::Shadowsocks(s) => s.servers.first().map(|x| (&x.address, x.port))?,
        OutboundSettings::VMess(s) => s.vnext.first().map(|x| (&x.address, x.port))?,
        OutboundSettings::VLess(s) => s.vnext.first().map(|x| (&x.address, x.port))?,
        OutboundSettings::Freedom(_)
        | OutboundSettings::Blackhole(_)
        | OutboundSettings::Dns(_)
        | OutboundSettings::Loopback(_) => return None,
    };
    Some(OutboundInfo::new(address.clone(), port))
}

/// Rewrites `{address, port}` of the first server/vnext entry in place,
/// leaving every other field untouched.
///
/// Returns `false` when there is no entry to patch.
pub fn set_outbound_info(settings: &mut OutboundSettings, info: &OutboundInfo) -> bool {
    let target = match settings {
        OutboundSettings::Http(s) => s.servers.first_mut().map(|x| (&mut x.address, &mut x.port)),
        OutboundSettings::Socks(s) => s.servers.first_mut().map(|x| (&mut x.address, &mut x.port)),
        OutboundSettings::Shadowsocks(s) => {
            s.servers.first_mut().map(|x| (&mut x.address, &mut x.port))
        }
        OutboundSettings::VMess(s) => s.vnext.first_mut().map(|x| (&mut x.address, &mut x.port)),
        OutboundSettings::VLess(s) => s.vnext.first_mut().map(|x| (&mut x.address, &mut x.port)),
        OutboundSettings::Freedom(_)
        | OutboundSettings::Blackhole(_)
        | OutboundSettings::Dns(_)
        | OutboundSettings::Loopback(_) => None,
    };

    match target {
        Some((address, port)) => {
            *address = info.address.clone();
            *port = info.port;
            true
        }
        None => false,
    }
}
