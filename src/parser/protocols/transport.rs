//! Query-string encoding of stream settings shared by the vmess and vless
//! codecs.
//!
//! Both schemes carry per-transport keys in the query string but disagree on
//! a few key names, captured by [`QueryDialect`]. Values equal to their
//! defaults are omitted on encode and restored on decode.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, bail};
use tracing::trace;

use crate::profile::stream::{
    DEFAULT_GRPC_SERVICE_NAME, DomainSocketSettings, GrpcSettings, HttpHeaderObfuscation,
    HttpSettings, KcpSettings, QuicSettings, StreamTransportKind, TcpHeader, TcpSettings,
    TlsSettings, Transport, WsSettings,
};

/// Key names that differ between link schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDialect {
    /// Header obfuscation type of tcp, kcp and quic.
    pub header_type: &'static str,
    /// QUIC encryption method.
    pub quic_security: &'static str,
    /// TLS server name.
    pub server_name: &'static str,
}

pub const VMESS_DIALECT: QueryDialect = QueryDialect {
    header_type: "type",
    quic_security: "security",
    server_name: "tlsServerName",
};

pub const VLESS_DIALECT: QueryDialect = QueryDialect {
    header_type: "headerType",
    quic_security: "quicSecurity",
    server_name: "sni",
};

pub type QueryParams = HashMap<String, String>;

fn param<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Decoding
// ============================================================================

/// Builds transport settings of `kind` from query parameters.
pub fn decode_transport(
    kind: StreamTransportKind,
    params: &QueryParams,
    dialect: QueryDialect,
) -> Result<Transport> {
    trace!("Decoding {} transport parameters", kind);
    let header_type = param(params, dialect.header_type).unwrap_or("none");

    let transport = match kind {
        StreamTransportKind::Tcp => {
            let header = match header_type {
                "none" => TcpHeader::None,
                "http" => {
                    let mut obfuscation = HttpHeaderObfuscation::default();
                    if let Some(path) = param(params, "path") {
                        obfuscation.request.path = split_list(path);
                    }
                    if let Some(host) = param(params, "host") {
                        obfuscation
                            .request
                            .headers
                            .insert("Host".to_string(), split_list(host));
                    }
                    TcpHeader::Http(obfuscation)
                }
                other => bail!("Unsupported tcp header type: {}", other),
            };
            Transport::Tcp(TcpSettings { header })
        }
        StreamTransportKind::Kcp => Transport::Kcp(KcpSettings {
            header_type: header_type.to_string(),
            seed: param(params, "seed").map(str::to_string),
            ..Default::default()
        }),
        StreamTransportKind::Ws => {
            let mut ws = WsSettings::with_path(param(params, "path").unwrap_or_default());
            if let Some(host) = param(params, "host") {
                ws.headers.insert("Host".to_string(), host.to_string());
            }
            Transport::Ws(ws)
        }
        StreamTransportKind::Http => {
            let mut http = HttpSettings::with_path(param(params, "path").unwrap_or_default());
            if let Some(host) = param(params, "host") {
                http.host = split_list(host);
            }
            Transport::Http(http)
        }
        StreamTransportKind::Quic => Transport::Quic(QuicSettings {
            security: param(params, dialect.quic_security)
                .unwrap_or("none")
                .to_string(),
            key: param(params, "key").unwrap_or_default().to_string(),
            header_type: header_type.to_string(),
        }),
        StreamTransportKind::Grpc => Transport::Grpc(GrpcSettings {
            service_name: param(params, "serviceName")
                .unwrap_or(DEFAULT_GRPC_SERVICE_NAME)
                .to_string(),
        }),
        StreamTransportKind::DomainSocket => Transport::DomainSocket(DomainSocketSettings {
            path: param(params, "path").unwrap_or_default().to_string(),
            ..Default::default()
        }),
    };

    Ok(transport)
}

/// Builds TLS settings from query parameters.
pub fn decode_tls(params: &QueryParams, dialect: QueryDialect) -> TlsSettings {
    TlsSettings {
        server_name: param(params, dialect.server_name).map(str::to_string),
        alpn: param(params, "alpn").map(split_list).unwrap_or_default(),
        allow_insecure: matches!(param(params, "allowInsecure"), Some("1" | "true")),
        ..Default::default()
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Query pairs for a transport, omitting default values.
pub fn encode_transport(transport: &Transport, dialect: QueryDialect) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut push = |key: &str, value: String| pairs.push((key.to_string(), value));

    match transport {
        Transport::Tcp(tcp) => {
            if let TcpHeader::Http(obfuscation) = &tcp.header {
                push(dialect.header_type, "http".to_string());
                if let Some(hosts) = header_values(&obfuscation.request.headers, "host")
                    && !hosts.is_empty()
                {
                    push("host", hosts.join(","));
                }
                let path = &obfuscation.request.path;
                if !(path.is_empty() || (path.len() == 1 && path[0] == "/")) {
                    push("path", path.join(","));
                }
            }
        }
        Transport::Kcp(kcp) => {
            if kcp.header_type != "none" {
                push(dialect.header_type, kcp.header_type.clone());
            }
            if let Some(seed) = kcp.seed.as_ref().filter(|s| !s.is_empty()) {
                push("seed", seed.clone());
            }
        }
        Transport::Ws(ws) => {
            if !is_root_path(&ws.path) {
                push("path", ws.path.clone());
            }
            if let Some(host) = ws.host() {
                push("host", host.to_string());
            }
        }
        Transport::Http(http) => {
            if !is_root_path(&http.path) {
                push("path", http.path.clone());
            }
            if !http.host.is_empty() {
                push("host", http.host.join(","));
            }
        }
        Transport::Quic(quic) => {
            if quic.security != "none" {
                push(dialect.quic_security, quic.security.clone());
            }
            if !quic.key.is_empty() {
                push("key", quic.key.clone());
            }
            if quic.header_type != "none" {
                push(dialect.header_type, quic.header_type.clone());
            }
        }
        Transport::Grpc(grpc) => {
            if grpc.service_name != DEFAULT_GRPC_SERVICE_NAME {
                push("serviceName", grpc.service_name.clone());
            }
        }
        Transport::DomainSocket(ds) => {
            if !ds.path.is_empty() {
                push("path", ds.path.clone());
            }
        }
    }

    pairs
}

/// Query pairs for TLS settings.
pub fn encode_tls(tls: &TlsSettings, dialect: QueryDialect) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(server_name) = tls.server_name.as_ref().filter(|s| !s.is_empty()) {
        pairs.push((dialect.server_name.to_string(), server_name.clone()));
    }
    if !tls.alpn.is_empty() {
        pairs.push(("alpn".to_string(), tls.alpn.join(",")));
    }
    if tls.allow_insecure {
        pairs.push(("allowInsecure".to_string(), "1".to_string()));
    }
    pairs
}

fn is_root_path(path: &str) -> bool {
    path.is_empty() || path == "/"
}

fn header_values<'a>(
    headers: &'a BTreeMap<String, Vec<String>>,
    name: &str,
) -> Option<&'a Vec<String>> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}
