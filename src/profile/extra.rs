//! Profile-wide sections: DNS, FakeDNS, browser forwarder and observatory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::util::{is_false, string_or_vec};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProfileExtraOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsObject>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fakedns: Vec<FakeDnsPool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_forwarder: Option<BrowserForwarder>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observatory: Option<Observatory>,
}

// ============================================================================
// DNS
// ============================================================================

/// Built-in resolver of the kernel.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DnsObject {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<DnsServer>,

    /// Static records, domain to address.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hosts: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,

    /// UseIP, UseIPv4 or UseIPv6.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_strategy: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_cache: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_fallback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// A DNS server, either a bare address or a detailed record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum DnsServer {
    Address(String),
    Detailed(DnsServerObject),
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DnsServerObject {
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,

    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub expect_ips: Vec<String>,
}

// ============================================================================
// FakeDNS / Browser Forwarder / Observatory
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FakeDnsPool {
    pub ip_pool: String,
    pub pool_size: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BrowserForwarder {
    pub listen_addr: String,
    pub listen_port: u16,
}

/// Background connectivity probing of selected outbounds.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Observatory {
    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub subject_selector: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_interval: Option<String>,
}
