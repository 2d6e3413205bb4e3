//! Application-wide inbound and connection settings.
//!
//! These feed the profile expander and are loaded from TOML. Every field has
//! a default, so an empty file is a valid configuration:
//!
//! ```toml
//! log_level = "warning"
//!
//! [inbound]
//! listen_address = "127.0.0.1"
//! listen_address_v6 = "::1"
//!
//! [inbound.http]
//! enabled = true
//! port = 8889
//!
//! [inbound.tproxy]
//! enabled = true
//! mode = "redirect"
//!
//! [connection]
//! bypass_cn = true
//! bypass_lan = true
//! dns_intercept = true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::util::default_true;
use crate::helpers::{expand_tilde, fetch_text, is_remote};
use crate::profile::inbound::{SniffProtocol, Sniffing};
use crate::profile::outbound::Account;
use crate::profile::stream::TProxyMode;

// ============================================================================
// Settings
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub inbound: GlobalInboundConfig,

    #[serde(default)]
    pub connection: GlobalConnectionConfig,

    /// Engine log level written into generated documents (debug, info,
    /// warning, error, none). Left to the engine default when unset.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings TOML")
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        Self::from_toml(&content)
    }

    pub async fn from_url(url: &str) -> Result<Self> {
        let content = fetch_text(url).await?;
        Self::from_toml(&content)
    }

    /// Load settings from a file path (with `~` expansion) or an http(s) URL.
    pub async fn load(path_or_url: &str) -> Result<Self> {
        if is_remote(path_or_url) {
            Self::from_url(path_or_url).await
        } else {
            let expanded = expand_tilde(path_or_url);
            Self::from_file(Path::new(&expanded)).await
        }
    }
}

// ============================================================================
// Inbound Settings
// ============================================================================

/// Listeners synthesized for simple profiles.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GlobalInboundConfig {
    /// IPv4 listen address; empty disables IPv4 listeners.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// IPv6 listen address; empty disables IPv6 listeners.
    #[serde(default)]
    pub listen_address_v6: String,

    #[serde(default)]
    pub http: HttpInboundConfig,

    #[serde(default)]
    pub socks: SocksInboundConfig,

    #[serde(default)]
    pub tproxy: TProxyInboundConfig,
}

impl Default for GlobalInboundConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_address_v6: String::new(),
            http: HttpInboundConfig::default(),
            socks: SocksInboundConfig::default(),
            tproxy: TProxyInboundConfig::default(),
        }
    }
}

/// Sniffing switches shared by every synthesized inbound kind.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SniffingConfig {
    #[serde(default = "default_true")]
    pub sniffing: bool,

    #[serde(default)]
    pub sniffing_metadata_only: bool,

    #[serde(default = "default_destination_override")]
    pub destination_override: Vec<SniffProtocol>,
}

impl Default for SniffingConfig {
    fn default() -> Self {
        Self {
            sniffing: true,
            sniffing_metadata_only: false,
            destination_override: default_destination_override(),
        }
    }
}

impl SniffingConfig {
    pub fn to_sniffing(&self) -> Sniffing {
        Sniffing {
            enabled: self.sniffing,
            metadata_only: self.sniffing_metadata_only,
            destination_override: self.destination_override.iter().copied().collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpInboundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_http_port")]
    pub port: u16,

    #[serde(default)]
    pub accounts: Vec<Account>,

    #[serde(flatten)]
    pub sniffing: SniffingConfig,
}

impl Default for HttpInboundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_http_port(),
            accounts: Vec::new(),
            sniffing: SniffingConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SocksInboundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_socks_port")]
    pub port: u16,

    #[serde(default)]
    pub accounts: Vec<Account>,

    #[serde(default = "default_true")]
    pub udp: bool,

    /// Address announced for UDP associate; the listen address when unset.
    #[serde(default)]
    pub udp_local_ip: Option<String>,

    #[serde(flatten)]
    pub sniffing: SniffingConfig,
}

impl Default for SocksInboundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_socks_port(),
            accounts: Vec::new(),
            udp: true,
            udp_local_ip: None,
            sniffing: SniffingConfig::default(),
        }
    }
}

/// Transparent proxy (dokodemo-door) listener.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TProxyInboundConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_tproxy_port")]
    pub port: u16,

    #[serde(default)]
    pub mode: TProxyMode,

    #[serde(default = "default_true")]
    pub tcp: bool,

    #[serde(default = "default_true")]
    pub udp: bool,

    #[serde(flatten)]
    pub sniffing: SniffingConfig,
}

impl Default for TProxyInboundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_tproxy_port(),
            mode: TProxyMode::Tproxy,
            tcp: true,
            udp: true,
            sniffing: SniffingConfig::default(),
        }
    }
}

// ============================================================================
// Connection Settings
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GlobalConnectionConfig {
    #[serde(default)]
    pub bypass_cn: bool,

    #[serde(default = "default_true")]
    pub bypass_lan: bool,

    #[serde(default)]
    pub bypass_bittorrent: bool,

    /// Send everything direct, ignoring the route matrix.
    #[serde(default)]
    pub force_direct: bool,

    /// Route DNS queries arriving on UDP-capable listeners to the kernel's
    /// resolver.
    #[serde(default)]
    pub dns_intercept: bool,
}

impl Default for GlobalConnectionConfig {
    fn default() -> Self {
        Self {
            bypass_cn: false,
            bypass_lan: true,
            bypass_bittorrent: false,
            force_direct: false,
            dns_intercept: false,
        }
    }
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_destination_override() -> Vec<SniffProtocol> {
    vec![SniffProtocol::Http, SniffProtocol::Tls]
}

fn default_http_port() -> u16 {
    8889
}

fn default_socks_port() -> u16 {
    1089
}

fn default_tproxy_port() -> u16 {
    12345
}
