//! `routing` block of the kernel document.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutingObject {
    pub domain_strategy: String,

    pub domain_matcher: String,

    #[serde(default)]
    pub rules: Vec<RuleFieldObject>,
}

impl Default for RoutingObject {
    fn default() -> Self {
        Self {
            domain_strategy: "AsIs".to_string(),
            domain_matcher: "mph".to_string(),
            rules: Vec::new(),
        }
    }
}

/// A `field` rule. Empty lists are omitted and therefore match everything.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleFieldObject {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    /// `tcp`, `udp` or `tcp,udp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inbound_tag: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocol: Vec<String>,

    pub outbound_tag: String,
}

impl RuleFieldObject {
    pub fn new(outbound_tag: impl Into<String>) -> Self {
        Self {
            kind: "field".to_string(),
            domain: Vec::new(),
            ip: Vec::new(),
            port: None,
            network: None,
            source: Vec::new(),
            inbound_tag: Vec::new(),
            protocol: Vec::new(),
            outbound_tag: outbound_tag.into(),
        }
    }

    /// Whether any match condition is set.
    pub fn has_conditions(&self) -> bool {
        !self.domain.is_empty()
            || !self.ip.is_empty()
            || self.port.is_some()
            || self.network.is_some()
            || !self.source.is_empty()
            || !self.inbound_tag.is_empty()
            || !self.protocol.is_empty()
    }
}
