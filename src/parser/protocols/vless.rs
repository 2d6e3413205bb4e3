//! VLESS share links.
//!
//! Format: `vless://uuid@host:port?query#name`. The query carries
//! `encryption`, `type`, the per-transport keys, `security`, `sni`, `alpn`
//! and, under XTLS only, `flow`.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use tracing::trace;
use url::Url;

use crate::profile::outbound::{
    OutboundDefinition, OutboundSettings, VLessClientSettings, VLessServer, VLessUser,
};
use crate::profile::stream::{SecurityKind, Security, StreamSettings, StreamTransportKind};

use super::transport::{VLESS_DIALECT, decode_tls, decode_transport, encode_tls, encode_transport};
use super::{NamedOutbound, ShareLinkCodec, fallback_name, format_host_port, percent_decode, unbracket_host};

pub struct VLessCodec;

impl ShareLinkCodec for VLessCodec {
    fn scheme(&self) -> &str {
        "vless"
    }

    fn decode(&self, link: &str) -> Result<NamedOutbound> {
        trace!("Decoding VLESS link");
        let url = Url::parse(link).context("Failed to parse VLESS link")?;

        let id = percent_decode(url.username());
        if id.is_empty() {
            bail!("VLESS link missing UUID");
        }

        let host = unbracket_host(url.host_str().unwrap_or_default()).to_string();
        if host.is_empty() {
            bail!("VLESS link missing host");
        }
        let port = url
            .port()
            .filter(|p| *p != 0)
            .ok_or_else(|| anyhow!("VLESS link missing or zero port"))?;

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let get = |key: &str| params.get(key).map(String::as_str).filter(|v| !v.is_empty());

        let network = get("type").unwrap_or("tcp");
        let kind = StreamTransportKind::from_name(network)
            .ok_or_else(|| anyhow!("Unknown VLESS transport: {}", network))?;
        let security_name = get("security").unwrap_or("none");
        let security_kind = SecurityKind::from_name(security_name)
            .ok_or_else(|| anyhow!("Unsupported VLESS security: {}", security_name))?;

        let mut stream = StreamSettings::new(decode_transport(kind, &params, VLESS_DIALECT)?);
        stream.security = match security_kind {
            SecurityKind::None => Security::None,
            SecurityKind::Tls => Security::Tls(decode_tls(&params, VLESS_DIALECT)),
            SecurityKind::Xtls => Security::Xtls(decode_tls(&params, VLESS_DIALECT)),
        };

        let mut user = VLessUser::new(id);
        if let Some(encryption) = get("encryption") {
            user.encryption = encryption.to_string();
        }
        if security_kind == SecurityKind::Xtls
            && let Some(flow) = get("flow")
        {
            user.flow = flow.to_string();
        }

        let settings = OutboundSettings::VLess(VLessClientSettings {
            vnext: vec![VLessServer {
                address: host.clone(),
                port,
                users: vec![user],
            }],
        });

        let name = url
            .fragment()
            .map(percent_decode)
            .unwrap_or_else(|| fallback_name(&host, port));
        Ok((
            name.clone(),
            OutboundDefinition::new(name, settings).with_stream(stream),
        ))
    }

    fn encode(&self, name: &str, outbound: &OutboundDefinition) -> Result<String> {
        let OutboundSettings::VLess(vless) = &outbound.settings else {
            bail!("vless codec cannot encode a {} outbound", outbound.protocol());
        };
        let server = vless
            .vnext
            .first()
            .ok_or_else(|| anyhow!("VLESS outbound has no server"))?;
        let user = server
            .users
            .first()
            .ok_or_else(|| anyhow!("VLESS outbound has no user"))?;
        if user.id.is_empty() {
            bail!("VLESS outbound has an empty UUID");
        }

        let mut query: Vec<(String, String)> = Vec::new();
        if user.encryption != "none" {
            query.push(("encryption".to_string(), user.encryption.clone()));
        }
        let network = outbound.stream.network();
        if network != StreamTransportKind::Tcp {
            query.push(("type".to_string(), network.as_str().to_string()));
        }
        query.extend(encode_transport(&outbound.stream.transport, VLESS_DIALECT));

        match &outbound.stream.security {
            Security::None => {}
            Security::Tls(tls) => {
                query.push(("security".to_string(), "tls".to_string()));
                query.extend(encode_tls(tls, VLESS_DIALECT));
            }
            Security::Xtls(tls) => {
                query.push(("security".to_string(), "xtls".to_string()));
                query.extend(encode_tls(tls, VLESS_DIALECT));
                if !user.flow.is_empty() {
                    query.push(("flow".to_string(), user.flow.clone()));
                }
            }
        }

        let mut link = format!(
            "vless://{}@{}",
            urlencoding::encode(&user.id),
            format_host_port(&server.address, server.port)
        );
        if !query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&query)
                .finish();
            link.push('?');
            link.push_str(&encoded);
        }
        link.push('#');
        link.push_str(&urlencoding::encode(name));
        Ok(link)
    }
}
