//! `dns` and `fakedns` sections of the kernel document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::util::is_false;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<DnsServerConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hosts: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_strategy: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_cache: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_fallback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Plain address string or a full server object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum DnsServerConfig {
    Address(String),
    Detailed(DnsServerObject),
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DnsServerObject {
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,

    #[serde(default, rename = "expectIPs", skip_serializing_if = "Vec::is_empty")]
    pub expect_ips: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FakeDnsPoolObject {
    pub ip_pool: String,
    pub pool_size: u32,
}
