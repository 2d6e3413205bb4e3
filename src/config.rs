use serde::{Deserialize, Serialize};

use crate::config::dns::{DnsConfig, FakeDnsPoolObject};
use crate::config::inbound::InboundObject;
use crate::config::outbound::OutboundObject;
use crate::config::route::RoutingObject;

pub mod dns;
pub mod inbound;
pub mod outbound;
pub mod route;
pub mod stream;
pub mod util;
pub mod validation;

/// Kernel configuration document.
///
/// This is the JSON file handed to a V2Ray-style engine. Optional sections
/// are omitted from serialization when unset.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KernelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fakedns: Vec<FakeDnsPoolObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_forwarder: Option<BrowserForwarderObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observatory: Option<ObservatoryObject>,

    #[serde(default)]
    pub inbounds: Vec<InboundObject>,

    #[serde(default)]
    pub outbounds: Vec<OutboundObject>,

    #[serde(default)]
    pub routing: RoutingObject,
}

/// Engine log settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogObject {
    /// debug, info, warning, error or none.
    pub loglevel: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogObject {
    pub fn level(loglevel: impl Into<String>) -> Self {
        Self {
            loglevel: loglevel.into(),
            access: None,
            error: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserForwarderObject {
    pub listen_addr: String,
    pub listen_port: u16,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservatoryObject {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_selector: Vec<String>,

    #[serde(default, rename = "probeURL", skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_interval: Option<String>,
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> KernelConfigBuilder {
        KernelConfigBuilder::new()
    }

    pub fn find_outbound(&self, tag: &str) -> Option<&OutboundObject> {
        self.outbounds.iter().find(|o| o.tag == tag)
    }

    pub fn find_inbound(&self, tag: &str) -> Option<&InboundObject> {
        self.inbounds.iter().find(|i| i.tag == tag)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Builder for [`KernelConfig`]
#[derive(Default)]
pub struct KernelConfigBuilder {
    config: KernelConfig,
}

impl KernelConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(mut self, log: LogObject) -> Self {
        self.config.log = Some(log);
        self
    }

    pub fn dns(mut self, dns: DnsConfig) -> Self {
        self.config.dns = Some(dns);
        self
    }

    pub fn fakedns(mut self, pool: FakeDnsPoolObject) -> Self {
        self.config.fakedns.push(pool);
        self
    }

    pub fn browser_forwarder(mut self, forwarder: BrowserForwarderObject) -> Self {
        self.config.browser_forwarder = Some(forwarder);
        self
    }

    pub fn observatory(mut self, observatory: ObservatoryObject) -> Self {
        self.config.observatory = Some(observatory);
        self
    }

    pub fn inbound(mut self, inbound: InboundObject) -> Self {
        self.config.inbounds.push(inbound);
        self
    }

    pub fn outbound(mut self, outbound: OutboundObject) -> Self {
        self.config.outbounds.push(outbound);
        self
    }

    pub fn routing(mut self, routing: RoutingObject) -> Self {
        self.config.routing = routing;
        self
    }

    pub fn build(self) -> KernelConfig {
        self.config
    }
}
