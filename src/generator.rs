//! Kernel config generator.
//!
//! Turns a fully specified [`Profile`] into the engine's JSON document.
//! Generation is all-or-nothing: anything the engine would misread (an
//! inbound protocol it cannot listen with, an unknown obfuscation type, a
//! SIP003 plugin) fails with a [`GenerateError`] instead of being dropped.

use std::fmt;
use std::net::IpAddr;

use tracing::debug;

use crate::config::dns::{DnsConfig, DnsServerConfig, DnsServerObject, FakeDnsPoolObject};
use crate::config::inbound::{
    AccountObject, DokodemoDoorObject, HttpInboundObject, InboundObject, InboundProtocolSettings,
    SniffingObject, SocksInboundObject,
};
use crate::config::outbound::{
    BlackholeObject, BlackholeResponseObject, DnsOutboundObject, FreedomObject, LoopbackObject,
    MuxObject, OutboundObject, OutboundProtocolSettings, ServerListObject, ServerObject,
    ShadowsocksObject, ShadowsocksServerObject, VLessObject, VLessServerObject, VLessUserObject,
    VMessObject, VMessServerObject, VMessUserObject,
};
use crate::config::route::{RoutingObject, RuleFieldObject};
use crate::config::{
    BrowserForwarderObject, KernelConfig, KernelConfigBuilder, LogObject, ObservatoryObject,
};
use crate::expander::expand;
use crate::profile::Profile;
use crate::profile::extra::{DnsObject, DnsServer, ProfileExtraOptions};
use crate::profile::inbound::{InboundDefinition, InboundSettings};
use crate::profile::outbound::{
    Account, AuthServer, BlackholeResponse, OutboundDefinition, OutboundSettings,
};
use crate::profile::routing::{Routing, RuleObject};
use crate::profile::stream::{SecurityKind, StreamSettings, StreamTransportKind};
use crate::settings::Settings;

pub mod stream;

pub use stream::generate_stream;

// ============================================================================
// Errors
// ============================================================================

/// Reasons a profile cannot be turned into a kernel document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    UnsupportedInboundProtocol { inbound: String, protocol: String },
    UnsupportedHeaderType {
        transport: StreamTransportKind,
        header_type: String,
    },
    UnsupportedQuicSecurity { security: String },
    UnsupportedPlugin { outbound: String, plugin: String },
    InvalidListenAddress { inbound: String, address: String },
    InvalidPortRange { rule: String, from: u16, to: u16 },
    EmptyOutboundTag { rule: String },
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedInboundProtocol { inbound, protocol } => {
                write!(f, "unsupported inbound protocol '{protocol}' on inbound '{inbound}'")
            }
            Self::UnsupportedHeaderType {
                transport,
                header_type,
            } => write!(
                f,
                "unsupported header obfuscation type '{header_type}' for {transport} transport"
            ),
            Self::UnsupportedQuicSecurity { security } => {
                write!(f, "unsupported QUIC security '{security}'")
            }
            Self::UnsupportedPlugin { outbound, plugin } => {
                write!(f, "outbound '{outbound}' uses unsupported SIP003 plugin '{plugin}'")
            }
            Self::InvalidListenAddress { inbound, address } => {
                write!(f, "inbound '{inbound}' has invalid listen address '{address}'")
            }
            Self::InvalidPortRange { rule, from, to } => {
                write!(f, "rule '{rule}' has invalid port range {from}-{to}")
            }
            Self::EmptyOutboundTag { rule } => {
                write!(f, "rule '{rule}' has an empty outbound tag")
            }
        }
    }
}

impl std::error::Error for GenerateError {}

// ============================================================================
// Entry Points
// ============================================================================

/// Generates the kernel document for a fully specified profile.
pub fn generate(profile: &Profile) -> Result<KernelConfig, GenerateError> {
    let mut builder = KernelConfig::builder();
    builder = apply_extra_options(builder, &profile.extra_options);

    for inbound in &profile.inbounds {
        builder = builder.inbound(generate_inbound(inbound)?);
    }

    for outbound in &profile.outbounds {
        builder = builder.outbound(generate_outbound(outbound)?);
    }

    let routing = generate_routing(&profile.routing)?;
    debug!(
        "Generated kernel config: {} inbounds, {} outbounds, {} rules",
        profile.inbounds.len(),
        profile.outbounds.len(),
        routing.rules.len()
    );

    Ok(builder.routing(routing).build())
}

/// Expands a simple profile with the global settings, then generates.
pub fn compile_profile(profile: &Profile, settings: &Settings) -> Result<KernelConfig, GenerateError> {
    let expanded = expand(profile, &settings.inbound, &settings.connection);
    let mut config = generate(&expanded)?;
    if let Some(level) = &settings.log_level {
        config.log = Some(LogObject::level(level.clone()));
    }
    Ok(config)
}

// ============================================================================
// Inbounds
// ============================================================================

fn generate_inbound(inbound: &InboundDefinition) -> Result<InboundObject, GenerateError> {
    if !is_valid_listen_address(&inbound.listen_address) {
        return Err(GenerateError::InvalidListenAddress {
            inbound: inbound.name.clone(),
            address: inbound.listen_address.clone(),
        });
    }

    let settings = match &inbound.settings {
        InboundSettings::Http(http) => InboundProtocolSettings::Http(HttpInboundObject {
            accounts: accounts(&http.accounts),
            allow_transparent: http.allow_transparent,
            user_level: http.user_level,
        }),
        InboundSettings::Socks(socks) => InboundProtocolSettings::Socks(SocksInboundObject {
            auth: socks.auth().to_string(),
            accounts: accounts(&socks.accounts),
            udp: socks.udp,
            ip: socks.ip.clone(),
            user_level: socks.user_level,
        }),
        InboundSettings::DokodemoDoor(door) => {
            let network = if door.network.is_empty() {
                "tcp".to_string()
            } else {
                door.network
                    .iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            };
            InboundProtocolSettings::DokodemoDoor(DokodemoDoorObject {
                address: door.address.clone(),
                port: door.port,
                network,
                follow_redirect: door.follow_redirect,
                user_level: door.user_level,
            })
        }
        InboundSettings::Unsupported { protocol, .. } => {
            return Err(GenerateError::UnsupportedInboundProtocol {
                inbound: inbound.name.clone(),
                protocol: protocol.clone(),
            });
        }
    };

    let sniffing = SniffingObject {
        enabled: inbound.sniffing.enabled,
        dest_override: inbound
            .sniffing
            .destination_override
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
        metadata_only: inbound.sniffing.metadata_only,
    };

    let stream_settings = if inbound.stream == StreamSettings::default() {
        None
    } else {
        Some(generate_stream(&inbound.stream)?)
    };

    Ok(InboundObject {
        tag: inbound.name.clone(),
        listen: inbound.listen_address.clone(),
        port: inbound.listen_port,
        settings,
        sniffing: Some(sniffing),
        stream_settings,
    })
}

/// An IPv4/IPv6 literal or a syntactically valid domain name.
fn is_valid_listen_address(address: &str) -> bool {
    if address.parse::<IpAddr>().is_ok() {
        return true;
    }

    !address.is_empty()
        && address.len() <= 253
        && address.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn accounts(accounts: &[Account]) -> Vec<AccountObject> {
    accounts
        .iter()
        .map(|a| AccountObject {
            user: a.user.clone(),
            pass: a.pass.clone(),
        })
        .collect()
}

// ============================================================================
// Outbounds
// ============================================================================

fn generate_outbound(outbound: &OutboundDefinition) -> Result<OutboundObject, GenerateError> {
    let security = outbound.stream.security_kind();

    let (settings, has_endpoint) = match &outbound.settings {
        OutboundSettings::Http(http) => (
            OutboundProtocolSettings::Http(server_list(&http.servers)),
            true,
        ),
        OutboundSettings::Socks(socks) => (
            OutboundProtocolSettings::Socks(server_list(&socks.servers)),
            true,
        ),
        OutboundSettings::Shadowsocks(ss) => {
            let mut servers = Vec::with_capacity(ss.servers.len());
            for server in &ss.servers {
                if let Some(plugin) = &server.plugin {
                    return Err(GenerateError::UnsupportedPlugin {
                        outbound: outbound.name.clone(),
                        plugin: plugin.name.clone(),
                    });
                }
                servers.push(ShadowsocksServerObject {
                    address: server.address.clone(),
                    port: server.port,
                    method: server.method.clone(),
                    password: server.password.clone(),
                    level: server.level,
                });
            }
            (
                OutboundProtocolSettings::Shadowsocks(ShadowsocksObject { servers }),
                true,
            )
        }
        OutboundSettings::VMess(vmess) => {
            let vnext = vmess
                .vnext
                .iter()
                .map(|server| VMessServerObject {
                    address: server.address.clone(),
                    port: server.port,
                    users: server
                        .users
                        .iter()
                        .map(|user| VMessUserObject {
                            id: user.id.clone(),
                            alter_id: user.alter_id,
                            security: user.security.clone(),
                            level: user.level,
                        })
                        .collect(),
                })
                .collect();
            (OutboundProtocolSettings::VMess(VMessObject { vnext }), true)
        }
        OutboundSettings::VLess(vless) => {
            let vnext = vless
                .vnext
                .iter()
                .map(|server| VLessServerObject {
                    address: server.address.clone(),
                    port: server.port,
                    users: server
                        .users
                        .iter()
                        .map(|user| VLessUserObject {
                            id: user.id.clone(),
                            encryption: user.encryption.clone(),
                            flow: (security == SecurityKind::Xtls && !user.flow.is_empty())
                                .then(|| user.flow.clone()),
                            level: user.level,
                        })
                        .collect(),
                })
                .collect();
            (OutboundProtocolSettings::VLess(VLessObject { vnext }), true)
        }
        OutboundSettings::Freedom(freedom) => (
            OutboundProtocolSettings::Freedom(FreedomObject {
                domain_strategy: freedom.domain_strategy.clone(),
                redirect: freedom.redirect.clone(),
            }),
            false,
        ),
        OutboundSettings::Blackhole(blackhole) => (
            OutboundProtocolSettings::Blackhole(BlackholeObject {
                response: blackhole.response.map(|r| BlackholeResponseObject {
                    kind: match r {
                        BlackholeResponse::None => "none",
                        BlackholeResponse::Http => "http",
                    }
                    .to_string(),
                }),
            }),
            false,
        ),
        OutboundSettings::Dns(dns) => (
            OutboundProtocolSettings::Dns(DnsOutboundObject {
                network: dns.network.clone(),
                address: dns.address.clone(),
                port: dns.port,
            }),
            false,
        ),
        OutboundSettings::Loopback(loopback) => (
            OutboundProtocolSettings::Loopback(LoopbackObject {
                inbound_tag: loopback.inbound_tag.clone(),
            }),
            false,
        ),
    };

    let stream_settings = if has_endpoint || outbound.stream != StreamSettings::default() {
        Some(generate_stream(&outbound.stream)?)
    } else {
        None
    };

    let mux = outbound.mux_enabled.then(|| MuxObject {
        enabled: true,
        concurrency: outbound.mux_concurrency,
    });

    Ok(OutboundObject {
        tag: outbound.name.clone(),
        settings,
        stream_settings,
        mux,
    })
}

fn server_list(servers: &[AuthServer]) -> ServerListObject {
    ServerListObject {
        servers: servers
            .iter()
            .map(|s| ServerObject {
                address: s.address.clone(),
                port: s.port,
                users: accounts(&s.users),
            })
            .collect(),
    }
}

// ============================================================================
// Routing
// ============================================================================

fn generate_routing(routing: &Routing) -> Result<RoutingObject, GenerateError> {
    let rules = routing
        .rules
        .iter()
        .filter(|rule| rule.enabled)
        .map(generate_rule)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RoutingObject {
        domain_strategy: routing.options.domain_strategy.clone(),
        domain_matcher: routing.options.domain_matcher.clone(),
        rules,
    })
}

fn generate_rule(rule: &RuleObject) -> Result<RuleFieldObject, GenerateError> {
    if rule.outbound_tag.trim().is_empty() {
        return Err(GenerateError::EmptyOutboundTag {
            rule: rule.name.clone(),
        });
    }

    if let Some(port) = rule.target_port
        && port.from > port.to
    {
        return Err(GenerateError::InvalidPortRange {
            rule: rule.name.clone(),
            from: port.from,
            to: port.to,
        });
    }

    let mut field = RuleFieldObject::new(rule.outbound_tag.clone());
    field.domain = rule.target_domains.clone();
    field.ip = rule.target_ips.clone();
    field.port = rule.target_port.map(|p| p.to_string());
    field.network = (!rule.networks.is_empty()).then(|| {
        rule.networks
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(",")
    });
    field.source = rule.source_addresses.clone();
    field.inbound_tag = rule.inbound_tags.clone();
    field.protocol = rule.protocols.iter().map(|p| p.as_str().to_string()).collect();
    Ok(field)
}

// ============================================================================
// Profile-wide Sections
// ============================================================================

fn apply_extra_options(
    mut builder: KernelConfigBuilder,
    extra: &ProfileExtraOptions,
) -> KernelConfigBuilder {
    if let Some(dns) = &extra.dns {
        builder = builder.dns(generate_dns(dns));
    }

    for pool in &extra.fakedns {
        builder = builder.fakedns(FakeDnsPoolObject {
            ip_pool: pool.ip_pool.clone(),
            pool_size: pool.pool_size,
        });
    }

    if let Some(forwarder) = &extra.browser_forwarder {
        builder = builder.browser_forwarder(BrowserForwarderObject {
            listen_addr: forwarder.listen_addr.clone(),
            listen_port: forwarder.listen_port,
        });
    }

    if let Some(observatory) = &extra.observatory {
        builder = builder.observatory(ObservatoryObject {
            subject_selector: observatory.subject_selector.clone(),
            probe_url: observatory.probe_url.clone(),
            probe_interval: observatory.probe_interval.clone(),
        });
    }

    builder
}

fn generate_dns(dns: &DnsObject) -> DnsConfig {
    DnsConfig {
        servers: dns
            .servers
            .iter()
            .map(|server| match server {
                DnsServer::Address(address) => DnsServerConfig::Address(address.clone()),
                DnsServer::Detailed(detail) => DnsServerConfig::Detailed(DnsServerObject {
                    address: detail.address.clone(),
                    port: detail.port,
                    domains: detail.domains.clone(),
                    expect_ips: detail.expect_ips.clone(),
                }),
            })
            .collect(),
        hosts: dns.hosts.clone(),
        client_ip: dns.client_ip.clone(),
        query_strategy: dns.query_strategy.clone(),
        disable_cache: dns.disable_cache,
        disable_fallback: dns.disable_fallback,
        tag: dns.tag.clone(),
    }
}
