//! Routing rules, the route matrix and the routing block of a profile.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::config::util::{default_true, string_or_vec};

// ============================================================================
// Match Predicates
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    Udp,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// Sniffed application protocols a rule may match.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuleProtocol {
    Http,
    Tls,
    Bittorrent,
}

impl RuleProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Tls => "tls",
            Self::Bittorrent => "bittorrent",
        }
    }
}

/// Inclusive destination port range, written `53` or `1000-2000`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "PortRangeRepr", into = "String")]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            from: port,
            to: port,
        }
    }

    pub fn new(from: u16, to: u16) -> anyhow::Result<Self> {
        if from > to {
            bail!("Port range start {} is greater than end {}", from, to);
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.from..=self.to).contains(&port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

impl FromStr for PortRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('-') {
            Some((from, to)) => {
                let from = from.trim().parse().context("Invalid port range start")?;
                let to = to.trim().parse().context("Invalid port range end")?;
                Self::new(from, to)
            }
            None => Ok(Self::single(s.parse().context("Invalid port")?)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortRangeRepr {
    Number(u16),
    Text(String),
}

impl TryFrom<PortRangeRepr> for PortRange {
    type Error = anyhow::Error;

    fn try_from(repr: PortRangeRepr) -> Result<Self, Self::Error> {
        match repr {
            PortRangeRepr::Number(port) => Ok(Self::single(port)),
            PortRangeRepr::Text(text) => text.parse(),
        }
    }
}

impl From<PortRange> for String {
    fn from(range: PortRange) -> Self {
        range.to_string()
    }
}

// ============================================================================
// Rule Object
// ============================================================================

/// A single routing rule.
///
/// A rule matches when every non-empty predicate holds; empty predicates
/// match everything.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RuleObject {
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub networks: BTreeSet<Network>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub protocols: BTreeSet<RuleProtocol>,

    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub source_addresses: Vec<String>,

    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub target_domains: Vec<String>,

    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub target_ips: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<PortRange>,

    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub inbound_tags: Vec<String>,

    pub outbound_tag: String,
}

impl RuleObject {
    pub fn new(name: impl Into<String>, outbound_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            networks: BTreeSet::new(),
            protocols: BTreeSet::new(),
            source_addresses: Vec::new(),
            target_domains: Vec::new(),
            target_ips: Vec::new(),
            target_port: None,
            inbound_tags: Vec::new(),
            outbound_tag: outbound_tag.into(),
        }
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ips<I, S>(mut self, ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_ips = ips.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_port(mut self, port: PortRange) -> Self {
        self.target_port = Some(port);
        self
    }

    pub fn with_inbound_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inbound_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_protocol(mut self, protocol: RuleProtocol) -> Self {
        self.protocols.insert(protocol);
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.networks.insert(network);
        self
    }

    /// Whether the rule restricts anything at all.
    pub fn has_match_predicates(&self) -> bool {
        !self.networks.is_empty()
            || !self.protocols.is_empty()
            || !self.source_addresses.is_empty()
            || !self.target_domains.is_empty()
            || !self.target_ips.is_empty()
            || self.target_port.is_some()
            || !self.inbound_tags.is_empty()
    }
}

// ============================================================================
// Route Matrix
// ============================================================================

/// Direct, proxy and block lists for one kind of target.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TargetLists {
    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub direct: Vec<String>,

    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub proxy: Vec<String>,

    #[serde(default, deserialize_with = "string_or_vec", skip_serializing_if = "Vec::is_empty")]
    pub block: Vec<String>,
}

/// User-edited routing lists from which default rules are synthesized.
///
/// Lists are expected to be disjoint; overlaps are resolved by rule order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RouteMatrix {
    #[serde(default = "default_domain_strategy")]
    pub domain_strategy: String,

    #[serde(default = "default_domain_matcher")]
    pub domain_matcher: String,

    #[serde(default)]
    pub domains: TargetLists,

    #[serde(default)]
    pub ips: TargetLists,
}

impl Default for RouteMatrix {
    fn default() -> Self {
        Self {
            domain_strategy: default_domain_strategy(),
            domain_matcher: default_domain_matcher(),
            domains: TargetLists::default(),
            ips: TargetLists::default(),
        }
    }
}

fn default_domain_strategy() -> String {
    "AsIs".to_string()
}

fn default_domain_matcher() -> String {
    "mph".to_string()
}

// ============================================================================
// Routing Block
// ============================================================================

/// Global routing options copied into the kernel document.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RoutingOptions {
    #[serde(default = "default_domain_strategy")]
    pub domain_strategy: String,

    #[serde(default = "default_domain_matcher")]
    pub domain_matcher: String,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            domain_strategy: default_domain_strategy(),
            domain_matcher: default_domain_matcher(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RoutingExtraOptions {
    #[serde(default)]
    pub route_matrix: RouteMatrix,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Routing {
    #[serde(default)]
    pub rules: Vec<RuleObject>,

    #[serde(default)]
    pub options: RoutingOptions,

    #[serde(default)]
    pub extra_options: RoutingExtraOptions,
}
