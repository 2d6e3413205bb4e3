//! Configuration validation module.
//!
//! Catches dangling tag references and duplicate tags in a generated
//! document before it is handed to the engine.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::config::KernelConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two inbounds share a tag.
    DuplicateInboundTag { tag: String },

    /// Two outbounds share a tag.
    DuplicateOutboundTag { tag: String },

    /// Rule targets an outbound that does not exist.
    RuleOutboundNotFound {
        /// The rule index (0-based).
        rule_index: usize,
        outbound: String,
    },

    /// Rule matches on an inbound tag that does not exist.
    RuleInboundNotFound {
        /// The rule index (0-based).
        rule_index: usize,
        inbound: String,
    },

    /// Rule without any condition; it matches all traffic and shadows every
    /// rule after it.
    RuleWithoutConditions {
        /// The rule index (0-based).
        rule_index: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateInboundTag { tag } => write!(f, "duplicate inbound tag '{tag}'"),
            Self::DuplicateOutboundTag { tag } => write!(f, "duplicate outbound tag '{tag}'"),
            Self::RuleOutboundNotFound {
                rule_index,
                outbound,
            } => {
                let rule_num = rule_index + 1;
                write!(
                    f,
                    "routing rule #{rule_num} references non-existent outbound '{outbound}'"
                )
            }
            Self::RuleInboundNotFound {
                rule_index,
                inbound,
            } => {
                let rule_num = rule_index + 1;
                write!(
                    f,
                    "routing rule #{rule_num} references non-existent inbound '{inbound}'"
                )
            }
            Self::RuleWithoutConditions { rule_index } => {
                let rule_num = rule_index + 1;
                write!(f, "routing rule #{rule_num} has no match conditions")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Result
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigError>,
}

impl ValidationResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Convert to a Result type.
    ///
    /// # Errors
    ///
    /// Returns the list of errors if validation failed.
    pub fn into_result(self) -> Result<(), Vec<ConfigError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Log all errors using tracing.
    pub fn log_errors(&self) {
        for error in &self.errors {
            warn!(error = %error, "configuration validation error");
        }
    }
}

// ============================================================================
// Validation Implementation
// ============================================================================

impl KernelConfig {
    /// Validate the document and return every problem found.
    ///
    /// Checks tag uniqueness for inbounds and outbounds, that every rule
    /// references existing tags, and that no rule is a bare catch-all.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        debug!("starting configuration validation");

        let inbound_tags = self.collect_inbound_tags(&mut result);
        let outbound_tags = self.collect_outbound_tags(&mut result);
        debug!(
            inbounds = inbound_tags.len(),
            outbounds = outbound_tags.len(),
            "collected tags"
        );

        self.check_rule_refs(&inbound_tags, &outbound_tags, &mut result);

        if result.is_ok() {
            debug!("configuration validation passed");
        } else {
            warn!(
                error_count = result.error_count(),
                "configuration validation failed"
            );
        }

        result
    }

    fn collect_inbound_tags(&self, result: &mut ValidationResult) -> HashSet<String> {
        let mut tags = HashSet::new();
        for inbound in &self.inbounds {
            if !tags.insert(inbound.tag.clone()) {
                result.add_error(ConfigError::DuplicateInboundTag {
                    tag: inbound.tag.clone(),
                });
            }
        }
        tags
    }

    fn collect_outbound_tags(&self, result: &mut ValidationResult) -> HashSet<String> {
        let mut tags = HashSet::new();
        for outbound in &self.outbounds {
            if !tags.insert(outbound.tag.clone()) {
                result.add_error(ConfigError::DuplicateOutboundTag {
                    tag: outbound.tag.clone(),
                });
            }
        }
        tags
    }

    fn check_rule_refs(
        &self,
        inbound_tags: &HashSet<String>,
        outbound_tags: &HashSet<String>,
        result: &mut ValidationResult,
    ) {
        for (rule_index, rule) in self.routing.rules.iter().enumerate() {
            if !outbound_tags.contains(&rule.outbound_tag) {
                result.add_error(ConfigError::RuleOutboundNotFound {
                    rule_index,
                    outbound: rule.outbound_tag.clone(),
                });
            }

            for inbound in &rule.inbound_tag {
                if !inbound_tags.contains(inbound) {
                    result.add_error(ConfigError::RuleInboundNotFound {
                        rule_index,
                        inbound: inbound.clone(),
                    });
                }
            }

            if !rule.has_conditions() {
                result.add_error(ConfigError::RuleWithoutConditions { rule_index });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::inbound::{HttpInboundObject, InboundObject, InboundProtocolSettings};
    use crate::config::outbound::{
        BlackholeObject, FreedomObject, OutboundObject, OutboundProtocolSettings,
    };
    use crate::config::route::{RoutingObject, RuleFieldObject};

    fn outbound(tag: &str, settings: OutboundProtocolSettings) -> OutboundObject {
        OutboundObject {
            tag: tag.to_string(),
            settings,
            stream_settings: None,
            mux: None,
        }
    }

    fn inbound(tag: &str) -> InboundObject {
        InboundObject {
            tag: tag.to_string(),
            listen: "127.0.0.1".to_string(),
            port: 8889,
            settings: InboundProtocolSettings::Http(HttpInboundObject::default()),
            sniffing: None,
            stream_settings: None,
        }
    }

    fn rule(outbound_tag: &str, ip: &str) -> RuleFieldObject {
        let mut rule = RuleFieldObject::new(outbound_tag);
        rule.ip = vec![ip.to_string()];
        rule
    }

    fn valid_config() -> KernelConfig {
        KernelConfig::builder()
            .inbound(inbound("http-in"))
            .outbound(outbound(
                "freedom",
                OutboundProtocolSettings::Freedom(FreedomObject::default()),
            ))
            .outbound(outbound(
                "blackhole",
                OutboundProtocolSettings::Blackhole(BlackholeObject::default()),
            ))
            .routing(RoutingObject {
                rules: vec![rule("freedom", "geoip:private")],
                ..Default::default()
            })
            .build()
    }

    #[test]
    fn test_valid_config() {
        let result = valid_config().validate();
        assert!(result.is_ok());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_duplicate_tags() {
        let mut config = valid_config();
        config.inbounds.push(inbound("http-in"));
        config.outbounds.push(outbound(
            "freedom",
            OutboundProtocolSettings::Freedom(FreedomObject::default()),
        ));

        let result = config.validate();
        assert_eq!(result.error_count(), 2);
        assert!(result.errors.contains(&ConfigError::DuplicateInboundTag {
            tag: "http-in".to_string()
        }));
        assert!(result.errors.contains(&ConfigError::DuplicateOutboundTag {
            tag: "freedom".to_string()
        }));
    }

    #[test]
    fn test_dangling_rule_references() {
        let mut config = valid_config();
        let mut dns_rule = RuleFieldObject::new("dns-out");
        dns_rule.inbound_tag = vec!["tproxy-in".to_string()];
        config.routing.rules.push(dns_rule);

        let errors = config.validate().into_result().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ConfigError::RuleOutboundNotFound {
                    rule_index: 1,
                    outbound: "dns-out".to_string()
                },
                ConfigError::RuleInboundNotFound {
                    rule_index: 1,
                    inbound: "tproxy-in".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_rule_without_conditions() {
        let mut config = valid_config();
        config.routing.rules.push(RuleFieldObject::new("freedom"));

        let result = config.validate();
        assert!(result.has_errors());
        assert_eq!(
            result.errors,
            vec![ConfigError::RuleWithoutConditions { rule_index: 1 }]
        );
        assert_eq!(
            result.errors[0].to_string(),
            "routing rule #2 has no match conditions"
        );
    }
}
