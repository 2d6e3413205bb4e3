//! Subscription payload decoders.
//!
//! Decoding never fails: malformed or unsupported payloads produce an empty
//! [`SubscriptionContent`] and a warning, and callers treat "empty" as
//! "nothing usable".

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::parser::base64::decode_base64_text;
use crate::parser::detection::{SubscriptionKind, detect_subscription_kind};
use crate::parser::protocols::{NamedOutbound, fallback_name};
use crate::profile::outbound::{
    OutboundDefinition, OutboundSettings, ShadowsocksClientSettings, ShadowsocksServer,
    Sip003Plugin,
};

// ============================================================================
// Result Types
// ============================================================================

/// What a subscription yielded.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct SubscriptionContent {
    /// Share links still to be decoded by the link codec.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// Outbounds the payload described directly.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outbounds: Vec<NamedOutbound>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<SubscriptionUsage>,
}

impl SubscriptionContent {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.outbounds.is_empty()
    }
}

/// Traffic and expiry metadata reported by OOC providers.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_used: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_remaining: Option<u64>,

    /// Unix timestamp in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

// ============================================================================
// Decoder Trait
// ============================================================================

pub trait SubscriptionDecoder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn decode(&self, raw: &[u8]) -> SubscriptionContent;
}

/// Decodes a payload with the decoder matching its detected kind.
pub fn decode_subscription(raw: &[u8]) -> SubscriptionContent {
    let text = String::from_utf8_lossy(raw);
    let kind = detect_subscription_kind(&text);
    debug!("Subscription payload detected as {}", kind);

    let decoder: &dyn SubscriptionDecoder = match kind {
        SubscriptionKind::OocV1Json => &OocV1Decoder,
        SubscriptionKind::PlainLinkList | SubscriptionKind::Base64LinkList => &SimpleDecoder,
        SubscriptionKind::Unknown => {
            warn!("Unrecognized subscription payload, nothing to import");
            return SubscriptionContent::default();
        }
    };
    let content = decoder.decode(raw);

    debug!(
        "Subscription decoded by {} decoder: {} links, {} outbounds",
        decoder.name(),
        content.links.len(),
        content.outbounds.len()
    );
    content
}

// ============================================================================
// Simple Decoder
// ============================================================================

/// Newline-separated share links, optionally wrapped in base64.
pub struct SimpleDecoder;

impl SubscriptionDecoder for SimpleDecoder {
    fn name(&self) -> &str {
        "simple"
    }

    fn decode(&self, raw: &[u8]) -> SubscriptionContent {
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();

        let plain = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            match decode_base64_text(trimmed) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("Subscription is neither a link list nor base64: {:#}", e);
                    return SubscriptionContent::default();
                }
            }
        };

        let links = plain
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        SubscriptionContent {
            links,
            ..Default::default()
        }
    }
}

// ============================================================================
// OOCv1 Decoder
// ============================================================================

/// Open Online Config v1 JSON documents.
pub struct OocV1Decoder;

#[derive(Deserialize, Debug)]
struct OocDocument {
    version: u32,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    user_uuid: Option<String>,
    #[serde(default)]
    bytes_used: Option<u64>,
    #[serde(default)]
    bytes_remaining: Option<u64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    servers: Vec<OocServer>,
}

#[derive(Deserialize, Debug)]
struct OocServer {
    #[serde(default)]
    id: String,
    #[serde(default)]
    remarks: String,
    server: String,
    server_port: u16,
    password: String,
    method: String,
    #[serde(default)]
    plugin: String,
    #[serde(default)]
    plugin_opts: String,
}

impl OocServer {
    fn into_outbound(self) -> NamedOutbound {
        let name = if !self.remarks.is_empty() {
            self.remarks
        } else if !self.id.is_empty() {
            self.id
        } else {
            fallback_name(&self.server, self.server_port)
        };

        let mut server =
            ShadowsocksServer::new(self.server, self.server_port, self.method, self.password);
        if !self.plugin.is_empty() {
            server.plugin = Some(Sip003Plugin {
                name: self.plugin,
                opts: self.plugin_opts,
            });
        }

        let settings = OutboundSettings::Shadowsocks(ShadowsocksClientSettings {
            servers: vec![server],
        });
        (name.clone(), OutboundDefinition::new(name, settings))
    }
}

impl SubscriptionDecoder for OocV1Decoder {
    fn name(&self) -> &str {
        "oocv1"
    }

    fn decode(&self, raw: &[u8]) -> SubscriptionContent {
        let document: OocDocument = match serde_json::from_slice(raw) {
            Ok(document) => document,
            Err(e) => {
                warn!("Invalid OOC subscription document: {}", e);
                return SubscriptionContent::default();
            }
        };

        if document.version != 1 {
            warn!(
                version = document.version,
                "Unsupported OOC subscription version, ignoring payload"
            );
            return SubscriptionContent::default();
        }

        let outbounds: Vec<NamedOutbound> = document
            .servers
            .into_iter()
            .map(OocServer::into_outbound)
            .collect();

        SubscriptionContent {
            links: Vec::new(),
            outbounds,
            usage: Some(SubscriptionUsage {
                username: document.username,
                user_uuid: document.user_uuid,
                bytes_used: document.bytes_used,
                bytes_remaining: document.bytes_remaining,
                expires_at: document.expires_at,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::base64::encode_standard;

    const OOC: &str = r#"{
        "version": 1,
        "username": "alice",
        "user_uuid": "00000000-0000-0000-0000-000000000000",
        "bytes_used": 1024,
        "bytes_remaining": 4096,
        "servers": [
            {
                "id": "27b8a625-4f4b-4428-9f0f-8a2317db7c79",
                "remarks": "Tokyo",
                "server": "tokyo.example.com",
                "server_port": 8388,
                "password": "secret",
                "method": "chacha20-ietf-poly1305",
                "plugin": "v2ray-plugin",
                "plugin_opts": "tls;host=tokyo.example.com"
            },
            {
                "server": "osaka.example.com",
                "server_port": 8389,
                "password": "secret",
                "method": "aes-256-gcm"
            }
        ]
    }"#;

    #[test]
    fn test_plain_list() {
        let raw = b"  ss://a@h:1#x\n\n# comment\nvless://id@h:2\r\n";
        let content = SimpleDecoder.decode(raw);
        assert_eq!(content.links, vec!["ss://a@h:1#x", "vless://id@h:2"]);
        assert!(content.outbounds.is_empty());
    }

    #[test]
    fn test_base64_list() {
        let encoded = encode_standard("vmess://tcp:id-0@h:1#a\nvless://id@h:2#b\n");
        let unpadded = encoded.trim_end_matches('=').replace('+', "-").replace('/', "_");
        let content = SimpleDecoder.decode(unpadded.as_bytes());
        assert_eq!(content.links, vec!["vmess://tcp:id-0@h:1#a", "vless://id@h:2#b"]);
    }

    #[test]
    fn test_decoder_names() {
        let decoders: [&dyn SubscriptionDecoder; 2] = [&SimpleDecoder, &OocV1Decoder];
        let names: Vec<&str> = decoders.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["simple", "oocv1"]);
    }

    #[test]
    fn test_garbage_is_empty() {
        let content = SimpleDecoder.decode(b"!!! definitely not a subscription !!!");
        assert!(content.is_empty());
    }

    #[test]
    fn test_ooc_v1() {
        let content = OocV1Decoder.decode(OOC.as_bytes());
        assert_eq!(content.outbounds.len(), 2);

        let (name, outbound) = &content.outbounds[0];
        assert_eq!(name, "Tokyo");
        let OutboundSettings::Shadowsocks(ss) = &outbound.settings else {
            panic!("Expected Shadowsocks outbound");
        };
        assert_eq!(ss.servers[0].port, 8388);
        assert_eq!(
            ss.servers[0].plugin.as_ref().map(|p| p.name.as_str()),
            Some("v2ray-plugin")
        );

        assert_eq!(content.outbounds[1].0, "osaka.example.com:8389");

        let usage = content.usage.unwrap();
        assert_eq!(usage.username.as_deref(), Some("alice"));
        assert_eq!(
            usage.user_uuid.as_deref(),
            Some("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(usage.bytes_used, Some(1024));
        assert_eq!(usage.expires_at, None);
    }

    #[test]
    fn test_ooc_unsupported_version_is_empty() {
        let payload = OOC.replacen("\"version\": 1", "\"version\": 2", 1);
        let content = OocV1Decoder.decode(payload.as_bytes());
        assert!(content.is_empty());
        assert!(content.usage.is_none());
    }

    #[test]
    fn test_decode_subscription_dispatch() {
        assert_eq!(decode_subscription(OOC.as_bytes()).outbounds.len(), 2);
        assert_eq!(decode_subscription(b"socks://h:1080").links.len(), 1);
        assert!(decode_subscription(b"").is_empty());
    }
}
