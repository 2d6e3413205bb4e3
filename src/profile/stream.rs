//! Stream settings: one transport variant plus an independent security layer.
//!
//! The transport is a sum type keyed by the `network` tag, so exactly one
//! transport-specific record is ever populated. Security is a second sum type
//! keyed by `security`; TLS fields only exist on the `Tls`/`Xtls` variants.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::util::{is_false, is_zero_u32};

// ============================================================================
// Kinds
// ============================================================================

/// Transport kinds understood by the kernel.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamTransportKind {
    #[default]
    Tcp,
    Kcp,
    Ws,
    Http,
    Quic,
    Grpc,
    #[serde(rename = "domainsocket")]
    DomainSocket,
}

impl StreamTransportKind {
    /// Canonical name used in share links and in the kernel document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Kcp => "kcp",
            Self::Ws => "ws",
            Self::Http => "http",
            Self::Quic => "quic",
            Self::Grpc => "grpc",
            Self::DomainSocket => "domainsocket",
        }
    }

    /// Parses a transport name, accepting the aliases other clients emit.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tcp" | "raw" => Some(Self::Tcp),
            "kcp" | "mkcp" => Some(Self::Kcp),
            "ws" | "websocket" => Some(Self::Ws),
            "http" | "h2" => Some(Self::Http),
            "quic" => Some(Self::Quic),
            "grpc" | "gun" => Some(Self::Grpc),
            "domainsocket" | "ds" => Some(Self::DomainSocket),
            _ => None,
        }
    }
}

impl std::fmt::Display for StreamTransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security layer kinds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecurityKind {
    #[default]
    None,
    Tls,
    Xtls,
}

impl SecurityKind {
    /// Name used by the `security` link parameter and the kernel document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tls => "tls",
            Self::Xtls => "xtls",
        }
    }

    /// Parses a security name case-insensitively.
    ///
    /// An empty name means no security layer. Returns `None` for layers the
    /// kernel does not support, such as `reality`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "tls" => Some(Self::Tls),
            "xtls" => Some(Self::Xtls),
            _ => None,
        }
    }
}

// ============================================================================
// Stream Settings
// ============================================================================

/// Transport, security and socket options of one inbound or outbound.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StreamSettings {
    #[serde(default)]
    pub transport: Transport,

    #[serde(default)]
    pub security: Security,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sockopt: Option<SockOpt>,
}

impl StreamSettings {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            ..Default::default()
        }
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn with_sockopt(mut self, sockopt: SockOpt) -> Self {
        self.sockopt = Some(sockopt);
        self
    }

    pub fn network(&self) -> StreamTransportKind {
        self.transport.kind()
    }

    pub fn security_kind(&self) -> SecurityKind {
        self.security.kind()
    }

    /// TLS record, present only when security is not `none`.
    pub fn tls(&self) -> Option<&TlsSettings> {
        match &self.security {
            Security::None => None,
            Security::Tls(tls) | Security::Xtls(tls) => Some(tls),
        }
    }
}

/// Transport-specific settings, tagged by `network`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "network", rename_all = "lowercase")]
pub enum Transport {
    Tcp(TcpSettings),
    Kcp(KcpSettings),
    Ws(WsSettings),
    Http(HttpSettings),
    Quic(QuicSettings),
    Grpc(GrpcSettings),
    #[serde(rename = "domainsocket")]
    DomainSocket(DomainSocketSettings),
}

impl Default for Transport {
    fn default() -> Self {
        Self::Tcp(TcpSettings::default())
    }
}

impl Transport {
    pub fn kind(&self) -> StreamTransportKind {
        match self {
            Self::Tcp(_) => StreamTransportKind::Tcp,
            Self::Kcp(_) => StreamTransportKind::Kcp,
            Self::Ws(_) => StreamTransportKind::Ws,
            Self::Http(_) => StreamTransportKind::Http,
            Self::Quic(_) => StreamTransportKind::Quic,
            Self::Grpc(_) => StreamTransportKind::Grpc,
            Self::DomainSocket(_) => StreamTransportKind::DomainSocket,
        }
    }

    /// Default settings for a transport kind.
    pub fn default_for(kind: StreamTransportKind) -> Self {
        match kind {
            StreamTransportKind::Tcp => Self::Tcp(TcpSettings::default()),
            StreamTransportKind::Kcp => Self::Kcp(KcpSettings::default()),
            StreamTransportKind::Ws => Self::Ws(WsSettings::default()),
            StreamTransportKind::Http => Self::Http(HttpSettings::default()),
            StreamTransportKind::Quic => Self::Quic(QuicSettings::default()),
            StreamTransportKind::Grpc => Self::Grpc(GrpcSettings::default()),
            StreamTransportKind::DomainSocket => {
                Self::DomainSocket(DomainSocketSettings::default())
            }
        }
    }
}

/// Security layer, tagged by `security`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(tag = "security", rename_all = "lowercase")]
pub enum Security {
    #[default]
    None,
    Tls(TlsSettings),
    Xtls(TlsSettings),
}

impl Security {
    pub fn kind(&self) -> SecurityKind {
        match self {
            Self::None => SecurityKind::None,
            Self::Tls(_) => SecurityKind::Tls,
            Self::Xtls(_) => SecurityKind::Xtls,
        }
    }
}

// ============================================================================
// TCP
// ============================================================================

/// Raw TCP, optionally disguised as HTTP/1.1.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TcpSettings {
    #[serde(default)]
    pub header: TcpHeader,
}

/// TCP header obfuscation.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TcpHeader {
    #[default]
    None,
    Http(HttpHeaderObfuscation),
}

/// Fake HTTP request/response pair wrapped around a TCP stream.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HttpHeaderObfuscation {
    #[serde(default)]
    pub request: HttpRequestHeader,

    #[serde(default)]
    pub response: HttpResponseHeader,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpRequestHeader {
    #[serde(default = "default_http_version")]
    pub version: String,

    #[serde(default = "default_http_method")]
    pub method: String,

    #[serde(default = "default_request_paths")]
    pub path: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

impl Default for HttpRequestHeader {
    fn default() -> Self {
        Self {
            version: default_http_version(),
            method: default_http_method(),
            path: default_request_paths(),
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpResponseHeader {
    #[serde(default = "default_http_version")]
    pub version: String,

    #[serde(default = "default_http_status")]
    pub status: String,

    #[serde(default = "default_http_reason")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

impl Default for HttpResponseHeader {
    fn default() -> Self {
        Self {
            version: default_http_version(),
            status: default_http_status(),
            reason: default_http_reason(),
            headers: BTreeMap::new(),
        }
    }
}

// ============================================================================
// mKCP
// ============================================================================

/// mKCP settings.
///
/// `header_type` is kept as free text; the generator rejects values outside
/// the obfuscation types the kernel knows.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KcpSettings {
    #[serde(default = "default_kcp_mtu")]
    pub mtu: u32,

    #[serde(default = "default_kcp_tti")]
    pub tti: u32,

    #[serde(default = "default_kcp_uplink")]
    pub uplink_capacity: u32,

    #[serde(default = "default_kcp_downlink")]
    pub downlink_capacity: u32,

    #[serde(default, skip_serializing_if = "is_false")]
    pub congestion: bool,

    #[serde(default = "default_kcp_buffer")]
    pub read_buffer_size: u32,

    #[serde(default = "default_kcp_buffer")]
    pub write_buffer_size: u32,

    #[serde(default = "default_header_type")]
    pub header_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

impl Default for KcpSettings {
    fn default() -> Self {
        Self {
            mtu: default_kcp_mtu(),
            tti: default_kcp_tti(),
            uplink_capacity: default_kcp_uplink(),
            downlink_capacity: default_kcp_downlink(),
            congestion: false,
            read_buffer_size: default_kcp_buffer(),
            write_buffer_size: default_kcp_buffer(),
            header_type: default_header_type(),
            seed: None,
        }
    }
}

// ============================================================================
// WebSocket / HTTP/2 / QUIC / gRPC / Domain Socket
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WsSettings {
    #[serde(default = "default_path", deserialize_with = "deserialize_path")]
    pub path: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub max_early_data: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_data_header_name: Option<String>,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            path: default_path(),
            headers: BTreeMap::new(),
            max_early_data: 0,
            early_data_header_name: None,
        }
    }
}

impl WsSettings {
    /// Settings with `path`; an empty path means the root.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: normalize_path(path.into()),
            ..Default::default()
        }
    }

    /// The `Host` header, looked up case-insensitively.
    pub fn host(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("host"))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,

    #[serde(default = "default_path", deserialize_with = "deserialize_path")]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: Vec::new(),
            path: default_path(),
            method: None,
        }
    }
}

impl HttpSettings {
    /// Settings with `path`; an empty path means the root.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: normalize_path(path.into()),
            ..Default::default()
        }
    }
}

/// QUIC settings; `security` and `header_type` are validated at generation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuicSettings {
    #[serde(default = "default_quic_security")]
    pub security: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    #[serde(default = "default_header_type")]
    pub header_type: String,
}

impl Default for QuicSettings {
    fn default() -> Self {
        Self {
            security: default_quic_security(),
            key: String::new(),
            header_type: default_header_type(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GrpcSettings {
    #[serde(default = "default_grpc_service_name")]
    pub service_name: String,
}

impl Default for GrpcSettings {
    fn default() -> Self {
        Self {
            service_name: default_grpc_service_name(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DomainSocketSettings {
    #[serde(default)]
    pub path: String,

    #[serde(default, rename = "abstract", skip_serializing_if = "is_false")]
    pub abstract_socket: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub padding: bool,
}

// ============================================================================
// TLS
// ============================================================================

/// TLS/XTLS client or server parameters.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TlsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_insecure: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_session_resumption: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_system_root: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<Certificate>,
}

impl TlsSettings {
    pub fn with_server_name(server_name: impl Into<String>) -> Self {
        Self {
            server_name: Some(server_name.into()),
            ..Default::default()
        }
    }
}

/// One certificate entry, either inline PEM lines or file paths.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Certificate {
    #[serde(default)]
    pub usage: CertificateUsage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CertificateUsage {
    #[default]
    Encipherment,
    Verify,
    Issue,
}

impl CertificateUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encipherment => "encipherment",
            Self::Verify => "verify",
            Self::Issue => "issue",
        }
    }
}

// ============================================================================
// Socket Options
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SockOpt {
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub mark: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_fast_open: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tproxy: Option<TProxyMode>,
}

/// Transparent proxy working mode of a dokodemo-door inbound.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TProxyMode {
    Off,
    #[default]
    Tproxy,
    Redirect,
}

impl TProxyMode {
    /// Value of the `sockopt.tproxy` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Tproxy => "tproxy",
            Self::Redirect => "redirect",
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

/// Header obfuscation types accepted by mKCP and QUIC.
pub const HEADER_OBFUSCATION_TYPES: [&str; 6] =
    ["none", "srtp", "utp", "wechat-video", "dtls", "wireguard"];

/// Encryption methods accepted by the QUIC transport.
pub const QUIC_SECURITY_TYPES: [&str; 3] = ["none", "aes-128-gcm", "chacha20-poly1305"];

pub const DEFAULT_GRPC_SERVICE_NAME: &str = "GunService";

fn default_http_version() -> String {
    "1.1".to_string()
}

fn default_http_method() -> String {
    "GET".to_string()
}

fn default_http_status() -> String {
    "200".to_string()
}

fn default_http_reason() -> String {
    "OK".to_string()
}

fn default_request_paths() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_path() -> String {
    "/".to_string()
}

fn normalize_path(path: String) -> String {
    if path.is_empty() { default_path() } else { path }
}

fn deserialize_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_path(String::deserialize(deserializer)?))
}

fn default_header_type() -> String {
    "none".to_string()
}

fn default_quic_security() -> String {
    "none".to_string()
}

fn default_grpc_service_name() -> String {
    DEFAULT_GRPC_SERVICE_NAME.to_string()
}

fn default_kcp_mtu() -> u32 {
    1350
}

fn default_kcp_tti() -> u32 {
    50
}

fn default_kcp_uplink() -> u32 {
    5
}

fn default_kcp_downlink() -> u32 {
    20
}

fn default_kcp_buffer() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stream_is_plain_tcp() {
        let stream = StreamSettings::default();
        assert_eq!(stream.network(), StreamTransportKind::Tcp);
        assert_eq!(stream.security_kind(), SecurityKind::None);
        assert!(stream.tls().is_none());
    }

    #[test]
    fn test_transport_tagged_by_network() {
        let stream = StreamSettings::new(Transport::Ws(WsSettings {
            path: "/ray".to_string(),
            ..Default::default()
        }));
        let json = serde_json::to_value(&stream).unwrap();
        assert_eq!(json["transport"]["network"], "ws");
        assert_eq!(json["transport"]["path"], "/ray");
        assert_eq!(json["security"]["security"], "none");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let json = r#"{"transport": {"network": "kcp"}, "security": {"security": "tls"}}"#;
        let stream: StreamSettings = serde_json::from_str(json).unwrap();
        match &stream.transport {
            Transport::Kcp(kcp) => {
                assert_eq!(kcp.mtu, 1350);
                assert_eq!(kcp.header_type, "none");
            }
            other => panic!("Expected kcp transport, got {:?}", other),
        }
        assert_eq!(stream.security_kind(), SecurityKind::Tls);
        assert!(stream.tls().is_some());
    }

    #[test]
    fn test_grpc_default_service_name() {
        let grpc: GrpcSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(grpc.service_name, "GunService");
    }

    #[test]
    fn test_transport_aliases() {
        assert_eq!(
            StreamTransportKind::from_name("websocket"),
            Some(StreamTransportKind::Ws)
        );
        assert_eq!(
            StreamTransportKind::from_name("h2"),
            Some(StreamTransportKind::Http)
        );
        assert_eq!(StreamTransportKind::from_name("carrier-pigeon"), None);
    }

    #[test]
    fn test_ws_host_case_insensitive() {
        let mut ws = WsSettings::default();
        ws.headers.insert("host".to_string(), "cdn.example.com".to_string());
        assert_eq!(ws.host(), Some("cdn.example.com"));
    }

    #[test]
    fn test_empty_path_means_root() {
        assert_eq!(WsSettings::with_path("").path, "/");
        assert_eq!(HttpSettings::with_path("/h2").path, "/h2");

        let ws: WsSettings = serde_json::from_str(r#"{"path": ""}"#).unwrap();
        assert_eq!(ws, WsSettings::default());
        let http: HttpSettings = serde_json::from_str(r#"{"path": ""}"#).unwrap();
        assert_eq!(http, HttpSettings::default());
    }

    #[test]
    fn test_tcp_http_header_roundtrip() {
        let tcp = TcpSettings {
            header: TcpHeader::Http(HttpHeaderObfuscation::default()),
        };
        let json = serde_json::to_string(&tcp).unwrap();
        let parsed: TcpSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tcp);
    }
}
