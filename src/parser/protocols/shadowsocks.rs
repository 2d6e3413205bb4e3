//! Shadowsocks share links.
//!
//! Two layouts are accepted:
//! - SIP002: `ss://BASE64URL(method:password)@host:port[/?plugin=name;opts]#name`
//! - Legacy: `ss://BASE64(method:password@host:port)#name`
//!
//! Encoding always produces SIP002.

use anyhow::{Context, Result, anyhow, bail};
use tracing::{trace, warn};

use crate::parser::base64::{decode_base64_text, encode_url_safe};
use crate::profile::outbound::{
    OutboundDefinition, OutboundSettings, ShadowsocksClientSettings, ShadowsocksServer,
    Sip003Plugin,
};

use super::{
    NamedOutbound, ShareLinkCodec, fallback_name, format_host_port, parse_host_port,
    percent_decode, split_fragment,
};

/// SIP003 plugins commonly paired with Shadowsocks servers.
const KNOWN_PLUGINS: [&str; 4] = ["obfs-local", "simple-obfs", "v2ray-plugin", "xray-plugin"];

pub struct ShadowsocksCodec;

impl ShareLinkCodec for ShadowsocksCodec {
    fn scheme(&self) -> &str {
        "ss"
    }

    fn decode(&self, link: &str) -> Result<NamedOutbound> {
        trace!("Decoding Shadowsocks link");
        let rest = link
            .strip_prefix("ss://")
            .ok_or_else(|| anyhow!("Invalid Shadowsocks link: missing ss:// prefix"))?;
        let (main, name) = split_fragment(rest);

        let server = match main.rfind('@') {
            Some(at_pos) => {
                trace!("Decoding as SIP002");
                self.decode_sip002(&main[..at_pos], &main[at_pos + 1..])?
            }
            None => {
                trace!("Decoding as legacy base64 link");
                self.decode_legacy(main)?
            }
        };

        let name = name.unwrap_or_else(|| fallback_name(&server.address, server.port));
        let settings = OutboundSettings::Shadowsocks(ShadowsocksClientSettings {
            servers: vec![server],
        });
        Ok((name.clone(), OutboundDefinition::new(name, settings)))
    }

    fn encode(&self, name: &str, outbound: &OutboundDefinition) -> Result<String> {
        let OutboundSettings::Shadowsocks(ss) = &outbound.settings else {
            bail!("ss codec cannot encode a {} outbound", outbound.protocol());
        };
        let server = ss
            .servers
            .first()
            .ok_or_else(|| anyhow!("Shadowsocks outbound has no server"))?;

        let userinfo = encode_url_safe(&format!("{}:{}", server.method, server.password));
        let mut link = format!(
            "ss://{}@{}",
            userinfo,
            format_host_port(&server.address, server.port)
        );

        if let Some(plugin) = &server.plugin {
            let value = if plugin.opts.is_empty() {
                plugin.name.clone()
            } else {
                format!("{};{}", plugin.name, plugin.opts)
            };
            link.push_str("/?plugin=");
            link.push_str(&urlencoding::encode(&value));
        }

        link.push('#');
        link.push_str(&urlencoding::encode(name));
        Ok(link)
    }
}

impl ShadowsocksCodec {
    fn decode_sip002(&self, userinfo: &str, endpoint: &str) -> Result<ShadowsocksServer> {
        let (hostport, query) = match endpoint.split_once('?') {
            Some((hostport, query)) => (hostport, Some(query)),
            None => (endpoint, None),
        };
        let (host, port) = parse_host_port(hostport.trim_end_matches('/'))?;

        // Plain `method:password` is allowed when percent-encoded.
        let plain = percent_decode(userinfo);
        let credentials = if plain.contains(':') {
            plain
        } else {
            decode_base64_text(userinfo).context("Invalid Shadowsocks user info")?
        };
        let (method, password) = split_credentials(&credentials)?;

        let mut server = ShadowsocksServer::new(host, port, method, password);
        server.plugin = query.and_then(parse_plugin_query);
        Ok(server)
    }

    /// `method:password@host:port`: the last `@` ends the credentials and the
    /// first `:` ends the method, so passwords containing `@` followed by
    /// something shaped like an endpoint are ambiguous.
    fn decode_legacy(&self, encoded: &str) -> Result<ShadowsocksServer> {
        let decoded =
            decode_base64_text(encoded).context("Failed to decode legacy Shadowsocks link")?;

        let (credentials, hostport) = decoded
            .rsplit_once('@')
            .ok_or_else(|| anyhow!("Invalid legacy Shadowsocks link: missing @"))?;
        let (host, port) = parse_host_port(hostport)?;
        let (method, password) = split_credentials(credentials)?;

        Ok(ShadowsocksServer::new(host, port, method, password))
    }
}

fn split_credentials(credentials: &str) -> Result<(String, String)> {
    let (method, password) = credentials
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid Shadowsocks user info: missing method:password separator"))?;
    if method.is_empty() {
        bail!("Shadowsocks method is empty");
    }
    Ok((method.to_string(), password.to_string()))
}

/// Reads `plugin=name;opts` from a SIP002 query string.
fn parse_plugin_query(query: &str) -> Option<Sip003Plugin> {
    let raw = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("plugin="))?;
    let decoded = percent_decode(raw);
    if decoded.is_empty() {
        return None;
    }

    let (name, opts) = decoded.split_once(';').unwrap_or((&decoded, ""));
    if !KNOWN_PLUGINS.contains(&name) {
        warn!(plugin = name, "Unknown SIP003 plugin, keeping it as given");
    }

    Some(Sip003Plugin {
        name: name.to_string(),
        opts: opts.to_string(),
    })
}
