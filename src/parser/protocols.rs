//! Share-link codecs.
//!
//! Each supported scheme implements [`ShareLinkCodec`], which decodes a link
//! into a named [`OutboundDefinition`] and encodes one back. The
//! [`LinkRegistry`] dispatches on the scheme prefix when decoding and on the
//! outbound protocol when encoding.

mod http;
mod shadowsocks;
pub mod transport;
mod vless;
mod vmess;

pub use http::AuthProxyCodec;
pub use shadowsocks::ShadowsocksCodec;
pub use vless::VLessCodec;
pub use vmess::VMessCodec;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, warn};

use crate::profile::outbound::{OutboundDefinition, OutboundProtocolKind};

/// A decoded share link: display name plus the outbound it describes.
///
/// The outbound's own `name` is set to the display name.
pub type NamedOutbound = (String, OutboundDefinition);

// ============================================================================
// Codec Trait
// ============================================================================

pub trait ShareLinkCodec: Send + Sync {
    /// Scheme without `://`, e.g. `vless`.
    fn scheme(&self) -> &str;

    /// Parses a link into a named outbound.
    fn decode(&self, link: &str) -> Result<NamedOutbound>;

    /// Emits a link for an outbound of this codec's protocol.
    fn encode(&self, name: &str, outbound: &OutboundDefinition) -> Result<String>;

    fn can_decode(&self, link: &str) -> bool {
        link.starts_with(&format!("{}://", self.scheme()))
    }
}

// ============================================================================
// Link Registry
// ============================================================================

/// Registry of share-link codecs keyed by scheme.
#[derive(Default)]
pub struct LinkRegistry {
    codecs: HashMap<String, Arc<dyn ShareLinkCodec>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Registry with the http, socks, ss, vmess and vless codecs.
    pub fn with_builtin_codecs() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AuthProxyCodec::http()));
        registry.register(Arc::new(AuthProxyCodec::socks()));
        registry.register(Arc::new(ShadowsocksCodec));
        registry.register(Arc::new(VMessCodec));
        registry.register(Arc::new(VLessCodec));
        registry
    }

    /// Registers `codec` under its scheme.
    ///
    /// A codec registered later for the same scheme replaces the earlier one.
    pub fn register(&mut self, codec: Arc<dyn ShareLinkCodec>) {
        self.codecs.insert(codec.scheme().to_string(), codec);
    }

    /// The codec for `scheme`, given without the `://` suffix.
    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn ShareLinkCodec>> {
        self.codecs.get(scheme)
    }

    /// Decodes one link with the codec registered for its scheme.
    pub fn decode(&self, link: &str) -> Result<NamedOutbound> {
        let link = link.trim();
        let scheme = extract_scheme(link)?;
        let codec = self
            .get(scheme)
            .ok_or_else(|| anyhow!("No codec registered for scheme: {}", scheme))?;

        let result = codec.decode(link);
        match &result {
            Ok((name, _)) => debug!("Decoded {} link -> outbound '{}'", scheme, name),
            Err(e) => debug!("Failed to decode {} link: {:#}", scheme, e),
        }
        result
    }

    /// Encodes an outbound with the codec matching its protocol.
    pub fn encode(&self, name: &str, outbound: &OutboundDefinition) -> Result<String> {
        let scheme = scheme_for(outbound.protocol()).ok_or_else(|| {
            anyhow!(
                "Outbound protocol '{}' has no share-link form",
                outbound.protocol()
            )
        })?;
        let codec = self
            .codecs
            .get(scheme)
            .ok_or_else(|| anyhow!("No codec registered for scheme: {}", scheme))?;
        codec.encode(name, outbound)
    }

    /// Decodes every non-empty, non-comment line.
    pub fn decode_lines(&self, content: &str) -> Vec<Result<NamedOutbound>> {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        debug!("Decoding {} link lines", lines.len());
        lines.into_iter().map(|line| self.decode(line)).collect()
    }

    /// Decodes every line, keeping only the links that parse.
    pub fn decode_lines_lossy(&self, content: &str) -> Vec<NamedOutbound> {
        let results = self.decode_lines(content);
        let total = results.len();

        let outbounds: Vec<NamedOutbound> = results
            .into_iter()
            .filter_map(|r| match r {
                Ok(outbound) => Some(outbound),
                Err(e) => {
                    warn!("Skipping undecodable link: {:#}", e);
                    None
                }
            })
            .collect();

        debug!(
            "Link list decoding complete: {} total, {} successful, {} failed",
            total,
            outbounds.len(),
            total - outbounds.len()
        );
        outbounds
    }
}

/// Link scheme used to share an outbound protocol, if it has one.
pub fn scheme_for(kind: OutboundProtocolKind) -> Option<&'static str> {
    match kind {
        OutboundProtocolKind::Http => Some("http"),
        OutboundProtocolKind::Socks => Some("socks"),
        OutboundProtocolKind::Shadowsocks => Some("ss"),
        OutboundProtocolKind::VMess => Some("vmess"),
        OutboundProtocolKind::VLess => Some("vless"),
        OutboundProtocolKind::Freedom
        | OutboundProtocolKind::Blackhole
        | OutboundProtocolKind::Dns
        | OutboundProtocolKind::Loopback => None,
    }
}

// ============================================================================
// Public Contract
// ============================================================================

/// Decodes a share link, or `None` when it is malformed or unsupported.
pub fn deserialize_link(link: &str) -> Option<NamedOutbound> {
    LinkRegistry::with_builtin_codecs().decode(link).ok()
}

/// Encodes an outbound as a share link, or `None` when it cannot be shared.
pub fn serialize_link(name: &str, outbound: &OutboundDefinition) -> Option<String> {
    match LinkRegistry::with_builtin_codecs().encode(name, outbound) {
        Ok(link) => Some(link),
        Err(e) => {
            debug!("Cannot encode outbound '{}': {:#}", name, e);
            None
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parses `host:port`, handling bracketed IPv6 addresses.
pub fn parse_host_port(hostport: &str) -> Result<(String, u16)> {
    let (host, port_str) = if let Some(rest) = hostport.strip_prefix('[') {
        let bracket_end = rest
            .find(']')
            .ok_or_else(|| anyhow!("Invalid IPv6 address: missing closing bracket"))?;
        let port_str = rest[bracket_end + 1..]
            .strip_prefix(':')
            .ok_or_else(|| anyhow!("Missing port after IPv6 address"))?;
        (&rest[..bracket_end], port_str)
    } else {
        hostport
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("Invalid host:port format: missing colon"))?
    };

    if host.is_empty() {
        bail!("Empty host in '{}'", hostport);
    }

    let port: u16 = port_str
        .parse()
        .map_err(|_| anyhow!("Invalid port number: {:?}", port_str))?;
    if port == 0 {
        bail!("Port 0 is not a valid endpoint port");
    }

    Ok((host.to_string(), port))
}

/// `host:port`, bracketing IPv6 literals.
pub fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Strips the brackets `url` keeps around IPv6 hosts.
pub fn unbracket_host(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// Splits `#fragment` off a link and percent-decodes it.
pub fn split_fragment(link: &str) -> (&str, Option<String>) {
    match link.split_once('#') {
        Some((main, fragment)) => (main, Some(percent_decode(fragment))),
        None => (link, None),
    }
}

pub fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Name used when a link carries no fragment.
pub fn fallback_name(host: &str, port: u16) -> String {
    format_host_port(host, port)
}

/// Extracts the scheme from a link.
pub fn extract_scheme(link: &str) -> Result<&str> {
    let (scheme, _) = link
        .split_once("://")
        .ok_or_else(|| anyhow!("Invalid link: missing scheme separator ://"))?;
    if scheme.is_empty() {
        bail!("Invalid link: missing scheme");
    }
    Ok(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::outbound::OutboundSettings;

    #[test]
    fn test_registry_with_builtin_codecs() {
        let registry = LinkRegistry::with_builtin_codecs();
        for scheme in ["http", "socks", "ss", "vmess", "vless"] {
            assert!(registry.get(scheme).is_some(), "missing codec for {}", scheme);
        }
        assert!(registry.get("trojan").is_none());
    }

    #[test]
    fn test_extract_scheme() {
        assert_eq!(extract_scheme("ss://abc").unwrap(), "ss");
        assert!(extract_scheme("not-a-link").is_err());
        assert!(extract_scheme("://missing").is_err());
    }

    #[test]
    fn test_unknown_scheme_has_no_result() {
        assert!(deserialize_link("trojan://pw@example.com:443").is_none());
        assert!(deserialize_link("garbage").is_none());
    }

    #[test]
    fn test_freedom_cannot_be_shared() {
        let outbound = OutboundDefinition::freedom("direct");
        assert!(serialize_link("direct", &outbound).is_none());
        assert!(matches!(
            outbound.settings,
            OutboundSettings::Freedom(_)
        ));
    }

    #[test]
    fn test_decode_lines_skips_comments_and_blanks() {
        let registry = LinkRegistry::with_builtin_codecs();
        let content = "# header\n\n  socks://example.com:1080#a  \nbogus://x\n";
        let results = registry.decode_lines(content);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());

        let lossy = registry.decode_lines_lossy(content);
        assert_eq!(lossy.len(), 1);
        assert_eq!(lossy[0].0, "a");
    }

    #[test]
    fn test_parse_host_port() {
        assert_eq!(
            parse_host_port("example.com:8080").unwrap(),
            ("example.com".to_string(), 8080)
        );
        assert_eq!(
            parse_host_port("[2001:db8::1]:443").unwrap(),
            ("2001:db8::1".to_string(), 443)
        );
        assert!(parse_host_port("example.com").is_err());
        assert!(parse_host_port(":443").is_err());
        assert!(parse_host_port("example.com:0").is_err());
        assert!(parse_host_port("example.com:99999").is_err());
        assert!(parse_host_port("[::1:8080").is_err());
    }

    #[test]
    fn test_format_host_port_brackets_ipv6() {
        assert_eq!(format_host_port("::1", 80), "[::1]:80");
        assert_eq!(format_host_port("1.2.3.4", 80), "1.2.3.4:80");
    }

    #[test]
    fn test_split_fragment() {
        let (main, name) = split_fragment("ss://abc@h:1#My%20Node");
        assert_eq!(main, "ss://abc@h:1");
        assert_eq!(name.as_deref(), Some("My Node"));
    }
}
