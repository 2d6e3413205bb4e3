//! The declarative profile model.
//!
//! A [`Profile`] is what users edit and persist: inbounds, an ordered list of
//! outbounds (index 0 is the default route target), routing rules and a few
//! profile-wide sections. Every entity is a plain value; expansion and
//! generation read a profile and return new values.

use serde::{Deserialize, Serialize};

pub mod extra;
pub mod inbound;
pub mod outbound;
pub mod routing;
pub mod stream;

use crate::profile::extra::ProfileExtraOptions;
use crate::profile::inbound::InboundDefinition;
use crate::profile::outbound::OutboundDefinition;
use crate::profile::routing::Routing;

// ============================================================================
// Well-known Tags
// ============================================================================

pub const FREEDOM_TAG: &str = "freedom";
pub const BLACKHOLE_TAG: &str = "blackhole";
pub const DNS_OUT_TAG: &str = "dns-out";

pub const HTTP_IN_TAG: &str = "http-in";
pub const HTTP_IN_V6_TAG: &str = "http-in-v6";
pub const SOCKS_IN_TAG: &str = "socks-in";
pub const SOCKS_IN_V6_TAG: &str = "socks-in-v6";
pub const TPROXY_IN_TAG: &str = "tproxy-in";
pub const TPROXY_IN_V6_TAG: &str = "tproxy-in-v6";

// ============================================================================
// Profile
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub inbounds: Vec<InboundDefinition>,

    #[serde(default)]
    pub outbounds: Vec<OutboundDefinition>,

    #[serde(default)]
    pub routing: Routing,

    #[serde(default)]
    pub extra_options: ProfileExtraOptions,
}

impl Profile {
    /// Profile holding a single outbound, as produced by importing a link.
    pub fn simple(outbound: OutboundDefinition) -> Self {
        Self {
            outbounds: vec![outbound],
            ..Default::default()
        }
    }

    /// No inbounds, no rules and exactly one outbound.
    ///
    /// Only simple profiles are expanded with default inbounds and rules.
    pub fn is_simple(&self) -> bool {
        self.inbounds.is_empty() && self.routing.rules.is_empty() && self.outbounds.len() == 1
    }

    pub fn find_outbound(&self, name: &str) -> Option<&OutboundDefinition> {
        self.outbounds.iter().find(|o| o.name == name)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::outbound::{OutboundSettings, VMessClientSettings};
    use crate::profile::routing::RuleObject;

    fn vmess() -> OutboundDefinition {
        OutboundDefinition::new(
            "proxy",
            OutboundSettings::VMess(VMessClientSettings::new("example.com", 443, "id")),
        )
    }

    #[test]
    fn test_is_simple() {
        assert!(Profile::simple(vmess()).is_simple());
        assert!(!Profile::default().is_simple());

        let mut with_rule = Profile::simple(vmess());
        with_rule
            .routing
            .rules
            .push(RuleObject::new("r", "proxy").with_domains(["example.com"]));
        assert!(!with_rule.is_simple());

        let mut two_outbounds = Profile::simple(vmess());
        two_outbounds.outbounds.push(OutboundDefinition::freedom(FREEDOM_TAG));
        assert!(!two_outbounds.is_simple());
    }

    #[test]
    fn test_json_roundtrip() {
        let profile = Profile::simple(vmess());
        let json = profile.to_json_pretty().unwrap();
        let parsed = Profile::from_json(&json).unwrap();
        assert_eq!(parsed, profile);
        assert_eq!(parsed.find_outbound("proxy"), Some(&vmess()));
    }

    #[test]
    fn test_minimal_json() {
        let profile = Profile::from_json(r#"{"outbounds": []}"#).unwrap();
        assert!(profile.inbounds.is_empty());
        assert_eq!(profile.routing.extra_options.route_matrix.domain_matcher, "mph");
    }
}
