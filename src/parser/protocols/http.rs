//! HTTP and SOCKS share links.
//!
//! Format: `http://[user:pass@]host:port[#name]`, and the same shape for
//! `socks://`. Credentials are percent-encoded.

use anyhow::{Result, anyhow, bail};
use tracing::trace;

use crate::profile::outbound::{
    AuthServer, HttpClientSettings, OutboundDefinition, OutboundSettings, SocksClientSettings,
};

use super::{
    NamedOutbound, ShareLinkCodec, fallback_name, format_host_port, parse_host_port,
    percent_decode, split_fragment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProxyKind {
    Http,
    Socks,
}

/// Codec for the user-info bearing `http://` and `socks://` links.
pub struct AuthProxyCodec {
    kind: ProxyKind,
}

impl AuthProxyCodec {
    pub fn http() -> Self {
        Self {
            kind: ProxyKind::Http,
        }
    }

    pub fn socks() -> Self {
        Self {
            kind: ProxyKind::Socks,
        }
    }

    fn servers<'a>(&self, outbound: &'a OutboundDefinition) -> Result<&'a [AuthServer]> {
        match (&outbound.settings, self.kind) {
            (OutboundSettings::Http(http), ProxyKind::Http) => Ok(&http.servers),
            (OutboundSettings::Socks(socks), ProxyKind::Socks) => Ok(&socks.servers),
            (other, _) => bail!(
                "{} codec cannot encode a {} outbound",
                self.scheme(),
                other.kind()
            ),
        }
    }
}

impl ShareLinkCodec for AuthProxyCodec {
    fn scheme(&self) -> &str {
        match self.kind {
            ProxyKind::Http => "http",
            ProxyKind::Socks => "socks",
        }
    }

    fn decode(&self, link: &str) -> Result<NamedOutbound> {
        trace!("Decoding {} link", self.scheme());
        let prefix = format!("{}://", self.scheme());
        let rest = link
            .strip_prefix(&prefix)
            .ok_or_else(|| anyhow!("Invalid link: missing {} prefix", prefix))?;

        let (main, name) = split_fragment(rest);
        let authority = main.trim_end_matches('/');

        let (userinfo, hostport) = match authority.rsplit_once('@') {
            Some((userinfo, hostport)) => (Some(userinfo), hostport),
            None => (None, authority),
        };

        let (host, port) = parse_host_port(hostport)?;
        let mut server = AuthServer::new(host.clone(), port);

        if let Some(userinfo) = userinfo {
            let (user, pass) = userinfo.split_once(':').unwrap_or((userinfo, ""));
            let user = percent_decode(user);
            if !user.is_empty() {
                server = server.with_auth(user, percent_decode(pass));
            }
        }

        let settings = match self.kind {
            ProxyKind::Http => OutboundSettings::Http(HttpClientSettings {
                servers: vec![server],
            }),
            ProxyKind::Socks => OutboundSettings::Socks(SocksClientSettings {
                servers: vec![server],
            }),
        };

        let name = name.unwrap_or_else(|| fallback_name(&host, port));
        Ok((name.clone(), OutboundDefinition::new(name, settings)))
    }

    fn encode(&self, name: &str, outbound: &OutboundDefinition) -> Result<String> {
        let server = self
            .servers(outbound)?
            .first()
            .ok_or_else(|| anyhow!("{} outbound has no server", self.scheme()))?;

        let userinfo = match server.users.first() {
            Some(account) => format!(
                "{}:{}@",
                urlencoding::encode(&account.user),
                urlencoding::encode(&account.pass)
            ),
            None => String::new(),
        };

        Ok(format!(
            "{}://{}{}#{}",
            self.scheme(),
            userinfo,
            format_host_port(&server.address, server.port),
            urlencoding::encode(name)
        ))
    }
}
