//! Routing rule compiler.
//!
//! Turns connection flags and a [`RouteMatrix`] into an ordered rule list.
//! The kernel evaluates rules top to bottom and the first match wins, so the
//! order produced here is the whole contract:
//!
//! 1. LAN bypass (`geoip:private` to freedom)
//! 2. block IPs, block domains (blackhole)
//! 3. proxy IPs, proxy domains (default outbound)
//! 4. direct IPs, direct domains (freedom)
//! 5. CN bypass (`geoip:cn`, then `geosite:cn`, to freedom)
//!
//! Force-direct replaces the whole list with three catch-all freedom rules.
//! Empty lists never produce a rule.

use tracing::debug;

use crate::profile::routing::{RouteMatrix, RoutingOptions, RuleObject};
use crate::profile::{BLACKHOLE_TAG, FREEDOM_TAG};
use crate::settings::GlobalConnectionConfig;

/// Flags that decide which default rules are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    pub force_direct: bool,
    pub bypass_cn: bool,
    pub bypass_lan: bool,
}

impl From<&GlobalConnectionConfig> for RoutePolicy {
    fn from(connection: &GlobalConnectionConfig) -> Self {
        Self {
            force_direct: connection.force_direct,
            bypass_cn: connection.bypass_cn,
            bypass_lan: connection.bypass_lan,
        }
    }
}

/// Rules plus the global routing options copied from the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRoutes {
    pub options: RoutingOptions,
    pub rules: Vec<RuleObject>,
}

/// Compiles the default rule list for `default_outbound_tag`.
pub fn compile_rules(
    policy: RoutePolicy,
    default_outbound_tag: &str,
    matrix: &RouteMatrix,
) -> CompiledRoutes {
    let options = RoutingOptions {
        domain_strategy: matrix.domain_strategy.clone(),
        domain_matcher: matrix.domain_matcher.clone(),
    };

    if policy.force_direct {
        debug!("Force-direct enabled, emitting catch-all freedom rules only");
        let rules = vec![
            RuleObject::new("Force Direct (domains)", FREEDOM_TAG).with_domains(["regexp:.*"]),
            RuleObject::new("Force Direct (IPv4)", FREEDOM_TAG).with_ips(["0.0.0.0/0"]),
            RuleObject::new("Force Direct (IPv6)", FREEDOM_TAG).with_ips(["::/0"]),
        ];
        return CompiledRoutes { options, rules };
    }

    let mut rules = Vec::new();

    if policy.bypass_lan {
        rules.push(RuleObject::new("Bypass LAN", FREEDOM_TAG).with_ips(["geoip:private"]));
    }

    let ips = &matrix.ips;
    let domains = &matrix.domains;
    let lists: [(&str, &Vec<String>, bool, &str); 6] = [
        ("Block IPs", &ips.block, true, BLACKHOLE_TAG),
        ("Block Domains", &domains.block, false, BLACKHOLE_TAG),
        ("Proxy IPs", &ips.proxy, true, default_outbound_tag),
        ("Proxy Domains", &domains.proxy, false, default_outbound_tag),
        ("Direct IPs", &ips.direct, true, FREEDOM_TAG),
        ("Direct Domains", &domains.direct, false, FREEDOM_TAG),
    ];

    for (name, targets, is_ip, outbound_tag) in lists {
        if targets.is_empty() {
            continue;
        }
        let rule = RuleObject::new(name, outbound_tag);
        rules.push(if is_ip {
            rule.with_ips(targets.iter().cloned())
        } else {
            rule.with_domains(targets.iter().cloned())
        });
    }

    if policy.bypass_cn {
        rules.push(RuleObject::new("Bypass CN IPs", FREEDOM_TAG).with_ips(["geoip:cn"]));
        rules.push(RuleObject::new("Bypass CN Domains", FREEDOM_TAG).with_domains(["geosite:cn"]));
    }

    debug!(
        "Compiled {} routing rules for default outbound '{}'",
        rules.len(),
        default_outbound_tag
    );
    CompiledRoutes { options, rules }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::routing::TargetLists;

    fn full_matrix() -> RouteMatrix {
        RouteMatrix {
            domain_strategy: "IPIfNonMatch".to_string(),
            domain_matcher: "linear".to_string(),
            domains: TargetLists {
                direct: vec!["domain:direct.example".to_string()],
                proxy: vec!["domain:proxy.example".to_string()],
                block: vec!["geosite:category-ads".to_string()],
            },
            ips: TargetLists {
                direct: vec!["10.0.0.0/8".to_string()],
                proxy: vec!["8.8.8.8".to_string()],
                block: vec!["1.2.3.4".to_string()],
            },
        }
    }

    fn outbound_tags(routes: &CompiledRoutes) -> Vec<&str> {
        routes.rules.iter().map(|r| r.outbound_tag.as_str()).collect()
    }

    #[test]
    fn test_full_order() {
        let policy = RoutePolicy {
            force_direct: false,
            bypass_cn: true,
            bypass_lan: true,
        };
        let routes = compile_rules(policy, "proxy", &full_matrix());
        let names: Vec<&str> = routes.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Bypass LAN",
                "Block IPs",
                "Block Domains",
                "Proxy IPs",
                "Proxy Domains",
                "Direct IPs",
                "Direct Domains",
                "Bypass CN IPs",
                "Bypass CN Domains",
            ]
        );
        assert_eq!(
            outbound_tags(&routes),
            vec![
                "freedom", "blackhole", "blackhole", "proxy", "proxy", "freedom", "freedom",
                "freedom", "freedom"
            ]
        );
        assert_eq!(routes.rules[0].target_ips, vec!["geoip:private"]);
        assert_eq!(routes.rules[7].target_ips, vec!["geoip:cn"]);
        assert_eq!(routes.rules[8].target_domains, vec!["geosite:cn"]);
    }

    #[test]
    fn test_options_copied_from_matrix() {
        let routes = compile_rules(RoutePolicy::default(), "proxy", &full_matrix());
        assert_eq!(routes.options.domain_strategy, "IPIfNonMatch");
        assert_eq!(routes.options.domain_matcher, "linear");
    }

    #[test]
    fn test_empty_lists_emit_nothing() {
        let routes = compile_rules(RoutePolicy::default(), "proxy", &RouteMatrix::default());
        assert!(routes.rules.is_empty());
    }

    #[test]
    fn test_force_direct_overrides_everything() {
        for bypass_lan in [false, true] {
            for bypass_cn in [false, true] {
                let policy = RoutePolicy {
                    force_direct: true,
                    bypass_cn,
                    bypass_lan,
                };
                let routes = compile_rules(policy, "proxy", &full_matrix());
                assert_eq!(routes.rules.len(), 3);
                assert_eq!(routes.rules[0].target_domains, vec!["regexp:.*"]);
                assert_eq!(routes.rules[1].target_ips, vec!["0.0.0.0/0"]);
                assert_eq!(routes.rules[2].target_ips, vec!["::/0"]);
                assert!(routes.rules.iter().all(|r| r.outbound_tag == FREEDOM_TAG));
            }
        }
    }

    #[test]
    fn test_policy_from_connection_config() {
        let connection = GlobalConnectionConfig {
            bypass_cn: true,
            bypass_lan: false,
            bypass_bittorrent: true,
            force_direct: false,
            dns_intercept: true,
        };
        let policy = RoutePolicy::from(&connection);
        assert!(policy.bypass_cn);
        assert!(!policy.bypass_lan);
        assert!(!policy.force_direct);
    }
}
