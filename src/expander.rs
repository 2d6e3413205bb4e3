//! Profile expander.
//!
//! A simple profile (one outbound, no inbounds, no rules) is turned into a
//! complete one: default listeners, the compiled rule list, optional DNS
//! interception and the terminal blackhole/freedom outbounds. Any other
//! profile passes through unchanged, which is how hand-authored profiles opt
//! out of default generation.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::profile::inbound::{
    DokodemoDoorSettings, HttpInboundSettings, InboundDefinition, InboundSettings,
    SocksInboundSettings,
};
use crate::profile::outbound::OutboundDefinition;
use crate::profile::routing::{Network, PortRange, RuleObject, RuleProtocol};
use crate::profile::stream::{SockOpt, StreamSettings};
use crate::profile::{
    BLACKHOLE_TAG, DNS_OUT_TAG, FREEDOM_TAG, HTTP_IN_TAG, HTTP_IN_V6_TAG, Profile, SOCKS_IN_TAG,
    SOCKS_IN_V6_TAG, TPROXY_IN_TAG, TPROXY_IN_V6_TAG,
};
use crate::routing::{RoutePolicy, compile_rules};

const RESERVED_OUTBOUND_TAGS: [&str; 3] = [FREEDOM_TAG, BLACKHOLE_TAG, DNS_OUT_TAG];
use crate::settings::{GlobalConnectionConfig, GlobalInboundConfig};

/// Expands a simple profile; returns other profiles unchanged.
pub fn expand(
    profile: &Profile,
    inbound: &GlobalInboundConfig,
    connection: &GlobalConnectionConfig,
) -> Profile {
    if !profile.is_simple() {
        debug!("Profile is not simple, skipping expansion");
        return profile.clone();
    }
    let Some(default_outbound) = profile.outbounds.first() else {
        return profile.clone();
    };

    let inbounds = synthesize_inbounds(inbound);

    let compiled = compile_rules(
        RoutePolicy::from(connection),
        &default_outbound.name,
        &profile.routing.extra_options.route_matrix,
    );
    let mut rules = compiled.rules;

    if connection.bypass_bittorrent {
        rules.insert(
            0,
            RuleObject::new("Bypass BitTorrent", FREEDOM_TAG).with_protocol(RuleProtocol::Bittorrent),
        );
    }

    if RESERVED_OUTBOUND_TAGS.contains(&default_outbound.name.as_str()) {
        warn!(
            "Outbound '{}' shares its name with a built-in outbound, generated tags will collide",
            default_outbound.name
        );
    }

    let mut outbounds = vec![default_outbound.clone()];

    if connection.dns_intercept {
        let dns_inbound_tags: Vec<String> = inbounds
            .iter()
            .filter(|i| i.accepts_udp())
            .map(|i| i.name.clone())
            .collect();

        if dns_inbound_tags.is_empty() {
            warn!("DNS interception enabled but no inbound accepts UDP, skipping");
        } else {
            rules.insert(
                0,
                RuleObject::new("DNS Intercept", DNS_OUT_TAG)
                    .with_port(PortRange::single(53))
                    .with_inbound_tags(dns_inbound_tags),
            );
            outbounds.push(OutboundDefinition::dns(DNS_OUT_TAG));
        }
    }

    outbounds.push(OutboundDefinition::blackhole(BLACKHOLE_TAG));
    outbounds.push(OutboundDefinition::freedom(FREEDOM_TAG));

    debug!(
        "Expanded profile: {} inbounds, {} outbounds, {} rules",
        inbounds.len(),
        outbounds.len(),
        rules.len()
    );

    let mut expanded = profile.clone();
    expanded.inbounds = inbounds;
    expanded.outbounds = outbounds;
    expanded.routing.rules = rules;
    expanded.routing.options = compiled.options;
    expanded
}

/// One inbound per enabled protocol and configured address family.
fn synthesize_inbounds(config: &GlobalInboundConfig) -> Vec<InboundDefinition> {
    let families = [
        (config.listen_address.as_str(), false),
        (config.listen_address_v6.as_str(), true),
    ];
    let mut inbounds = Vec::new();

    if config.http.enabled {
        for (address, v6) in families.iter().filter(|(a, _)| !a.is_empty()) {
            let settings = InboundSettings::Http(HttpInboundSettings {
                accounts: config.http.accounts.clone(),
                ..Default::default()
            });
            let tag = if *v6 { HTTP_IN_V6_TAG } else { HTTP_IN_TAG };
            inbounds.push(
                InboundDefinition::new(tag, *address, config.http.port, settings)
                    .with_sniffing(config.http.sniffing.to_sniffing()),
            );
        }
    }

    if config.socks.enabled {
        for (address, v6) in families.iter().filter(|(a, _)| !a.is_empty()) {
            let settings = InboundSettings::Socks(SocksInboundSettings {
                accounts: config.socks.accounts.clone(),
                udp: config.socks.udp,
                ip: config.socks.udp_local_ip.clone(),
                ..Default::default()
            });
            let tag = if *v6 { SOCKS_IN_V6_TAG } else { SOCKS_IN_TAG };
            inbounds.push(
                InboundDefinition::new(tag, *address, config.socks.port, settings)
                    .with_sniffing(config.socks.sniffing.to_sniffing()),
            );
        }
    }

    if config.tproxy.enabled {
        let mut network = BTreeSet::new();
        if config.tproxy.tcp {
            network.insert(Network::Tcp);
        }
        if config.tproxy.udp {
            network.insert(Network::Udp);
        }

        if network.is_empty() {
            warn!("Transparent proxy enabled with neither TCP nor UDP, no inbound created");
        } else {
            for (address, v6) in families.iter().filter(|(a, _)| !a.is_empty()) {
                let settings = InboundSettings::DokodemoDoor(DokodemoDoorSettings {
                    network: network.clone(),
                    follow_redirect: true,
                    ..Default::default()
                });
                let stream = StreamSettings::default().with_sockopt(SockOpt {
                    tproxy: Some(config.tproxy.mode),
                    ..Default::default()
                });
                let tag = if *v6 { TPROXY_IN_V6_TAG } else { TPROXY_IN_TAG };
                inbounds.push(
                    InboundDefinition::new(tag, *address, config.tproxy.port, settings)
                        .with_sniffing(config.tproxy.sniffing.to_sniffing())
                        .with_stream(stream),
                );
            }
        }
    }

    inbounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::outbound::{OutboundProtocolKind, OutboundSettings, VMessClientSettings};
    use crate::profile::stream::TProxyMode;

    fn simple_profile() -> Profile {
        Profile::simple(OutboundDefinition::new(
            "my-vmess",
            OutboundSettings::VMess(VMessClientSettings::new("example.com", 443, "id")),
        ))
    }

    fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<&str> {
        items.iter().map(name).collect()
    }

    #[test]
    fn test_default_expansion() {
        let inbound = GlobalInboundConfig::default();
        let connection = GlobalConnectionConfig::default();
        let expanded = expand(&simple_profile(), &inbound, &connection);

        assert_eq!(
            names(&expanded.inbounds, |i| i.name.as_str()),
            vec!["http-in", "socks-in"]
        );
        assert_eq!(
            names(&expanded.outbounds, |o| o.name.as_str()),
            vec!["my-vmess", "blackhole", "freedom"]
        );
        assert_eq!(expanded.routing.rules[0].target_ips, vec!["geoip:private"]);
        assert_eq!(expanded.outbounds[1].protocol(), OutboundProtocolKind::Blackhole);
        assert_eq!(expanded.outbounds[2].protocol(), OutboundProtocolKind::Freedom);
    }

    #[test]
    fn test_ipv6_variants() {
        let inbound = GlobalInboundConfig {
            listen_address_v6: "::1".to_string(),
            ..Default::default()
        };
        let expanded = expand(&simple_profile(), &inbound, &GlobalConnectionConfig::default());
        assert_eq!(
            names(&expanded.inbounds, |i| i.name.as_str()),
            vec!["http-in", "http-in-v6", "socks-in", "socks-in-v6"]
        );
        assert_eq!(expanded.inbounds[1].listen_address, "::1");
    }

    #[test]
    fn test_ipv6_only() {
        let inbound = GlobalInboundConfig {
            listen_address: String::new(),
            listen_address_v6: "::".to_string(),
            ..Default::default()
        };
        let expanded = expand(&simple_profile(), &inbound, &GlobalConnectionConfig::default());
        assert_eq!(
            names(&expanded.inbounds, |i| i.name.as_str()),
            vec!["http-in-v6", "socks-in-v6"]
        );
    }

    #[test]
    fn test_tproxy_and_dns_interception() {
        let mut inbound = GlobalInboundConfig::default();
        inbound.http.enabled = false;
        inbound.socks.enabled = false;
        inbound.tproxy.enabled = true;
        inbound.tproxy.mode = TProxyMode::Redirect;
        inbound.listen_address_v6 = "::".to_string();

        let connection = GlobalConnectionConfig {
            bypass_bittorrent: true,
            dns_intercept: true,
            ..Default::default()
        };
        let expanded = expand(&simple_profile(), &inbound, &connection);

        assert_eq!(
            names(&expanded.inbounds, |i| i.name.as_str()),
            vec!["tproxy-in", "tproxy-in-v6"]
        );
        assert_eq!(
            expanded.inbounds[0].stream.sockopt.as_ref().and_then(|s| s.tproxy),
            Some(TProxyMode::Redirect)
        );

        let dns_rule = &expanded.routing.rules[0];
        assert_eq!(dns_rule.outbound_tag, DNS_OUT_TAG);
        assert_eq!(dns_rule.target_port, Some(PortRange::single(53)));
        assert_eq!(dns_rule.inbound_tags, vec!["tproxy-in", "tproxy-in-v6"]);

        let bt_rule = &expanded.routing.rules[1];
        assert!(bt_rule.protocols.contains(&RuleProtocol::Bittorrent));
        assert_eq!(bt_rule.outbound_tag, FREEDOM_TAG);

        assert_eq!(expanded.routing.rules[2].target_ips, vec!["geoip:private"]);

        assert_eq!(
            names(&expanded.outbounds, |o| o.name.as_str()),
            vec!["my-vmess", "dns-out", "blackhole", "freedom"]
        );
    }

    fn dns_intercept() -> GlobalConnectionConfig {
        GlobalConnectionConfig {
            dns_intercept: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_dns_interception_on_socks_udp() {
        let expanded = expand(&simple_profile(), &GlobalInboundConfig::default(), &dns_intercept());

        let dns_rule = &expanded.routing.rules[0];
        assert_eq!(dns_rule.outbound_tag, DNS_OUT_TAG);
        assert_eq!(dns_rule.inbound_tags, vec!["socks-in"]);
        assert_eq!(
            names(&expanded.outbounds, |o| o.name.as_str()),
            vec!["my-vmess", "dns-out", "blackhole", "freedom"]
        );
    }

    #[test]
    fn test_dns_interception_collects_every_udp_inbound() {
        let mut inbound = GlobalInboundConfig::default();
        inbound.tproxy.enabled = true;
        let expanded = expand(&simple_profile(), &inbound, &dns_intercept());
        assert_eq!(
            expanded.routing.rules[0].inbound_tags,
            vec!["socks-in", "tproxy-in"]
        );
    }

    #[test]
    fn test_dns_interception_without_udp_inbound_is_skipped() {
        let mut inbound = GlobalInboundConfig::default();
        inbound.socks.udp = false;
        let expanded = expand(&simple_profile(), &inbound, &dns_intercept());

        assert!(expanded.routing.rules.iter().all(|r| r.outbound_tag != DNS_OUT_TAG));
        assert!(expanded.find_outbound(DNS_OUT_TAG).is_none());
    }

    #[test]
    fn test_reserved_outbound_name_still_expands() {
        let profile = Profile::simple(OutboundDefinition::freedom(FREEDOM_TAG));
        let expanded = expand(
            &profile,
            &GlobalInboundConfig::default(),
            &GlobalConnectionConfig::default(),
        );
        assert_eq!(
            names(&expanded.outbounds, |o| o.name.as_str()),
            vec!["freedom", "blackhole", "freedom"]
        );
    }

    #[test]
    fn test_non_simple_profile_unchanged() {
        let mut profile = simple_profile();
        profile.outbounds.push(OutboundDefinition::freedom("direct"));
        let expanded = expand(
            &profile,
            &GlobalInboundConfig::default(),
            &GlobalConnectionConfig::default(),
        );
        assert_eq!(expanded, profile);
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let inbound = GlobalInboundConfig::default();
        let connection = GlobalConnectionConfig {
            bypass_cn: true,
            ..Default::default()
        };
        let once = expand(&simple_profile(), &inbound, &connection);
        let twice = expand(&once, &inbound, &connection);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_input_not_mutated() {
        let profile = simple_profile();
        let before = profile.clone();
        let _ = expand(
            &profile,
            &GlobalInboundConfig::default(),
            &GlobalConnectionConfig::default(),
        );
        assert_eq!(profile, before);
    }
}
