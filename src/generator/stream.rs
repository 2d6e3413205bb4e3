//! Stream settings encoding.
//!
//! Exactly one transport block is written, chosen by the transport variant,
//! and the security block is written beside it.

use tracing::trace;

use crate::config::stream::{
    CertificateObject, DomainSocketObject, GrpcObject, HeaderObject, HttpObject,
    HttpRequestObject, HttpResponseObject, KcpObject, QuicObject, SockoptObject,
    StreamSettingsObject, TcpObject, TlsObject, WsObject,
};
use crate::generator::GenerateError;
use crate::profile::stream::{
    HEADER_OBFUSCATION_TYPES, QUIC_SECURITY_TYPES, Security, SockOpt, StreamSettings,
    StreamTransportKind, TcpHeader, TlsSettings, Transport,
};

/// Encodes a profile stream into the kernel's `streamSettings` block.
pub fn generate_stream(stream: &StreamSettings) -> Result<StreamSettingsObject, GenerateError> {
    let network = stream.network();
    let mut object = StreamSettingsObject {
        network: network.as_str().to_string(),
        security: stream.security_kind().as_str().to_string(),
        ..Default::default()
    };

    match &stream.transport {
        Transport::Tcp(tcp) => {
            let header = match &tcp.header {
                TcpHeader::None => HeaderObject::of_type("none"),
                TcpHeader::Http(http) => HeaderObject {
                    kind: "http".to_string(),
                    request: Some(HttpRequestObject {
                        version: http.request.version.clone(),
                        method: http.request.method.clone(),
                        path: http.request.path.clone(),
                        headers: http.request.headers.clone(),
                    }),
                    response: Some(HttpResponseObject {
                        version: http.response.version.clone(),
                        status: http.response.status.clone(),
                        reason: http.response.reason.clone(),
                        headers: http.response.headers.clone(),
                    }),
                },
            };
            object.tcp_settings = Some(TcpObject { header });
        }
        Transport::Kcp(kcp) => {
            check_header_type(network, &kcp.header_type)?;
            object.kcp_settings = Some(KcpObject {
                mtu: kcp.mtu,
                tti: kcp.tti,
                uplink_capacity: kcp.uplink_capacity,
                downlink_capacity: kcp.downlink_capacity,
                congestion: kcp.congestion,
                read_buffer_size: kcp.read_buffer_size,
                write_buffer_size: kcp.write_buffer_size,
                header: HeaderObject::of_type(kcp.header_type.clone()),
                seed: kcp.seed.clone().filter(|s| !s.is_empty()),
            });
        }
        Transport::Ws(ws) => {
            object.ws_settings = Some(WsObject {
                path: ws.path.clone(),
                headers: ws.headers.clone(),
                max_early_data: ws.max_early_data,
                early_data_header_name: ws.early_data_header_name.clone(),
            });
        }
        Transport::Http(http) => {
            object.http_settings = Some(HttpObject {
                host: http.host.clone(),
                path: http.path.clone(),
                method: http.method.clone(),
            });
        }
        Transport::Quic(quic) => {
            if !QUIC_SECURITY_TYPES.contains(&quic.security.as_str()) {
                return Err(GenerateError::UnsupportedQuicSecurity {
                    security: quic.security.clone(),
                });
            }
            check_header_type(network, &quic.header_type)?;
            object.quic_settings = Some(QuicObject {
                security: quic.security.clone(),
                key: quic.key.clone(),
                header: HeaderObject::of_type(quic.header_type.clone()),
            });
        }
        Transport::Grpc(grpc) => {
            object.grpc_settings = Some(GrpcObject {
                service_name: grpc.service_name.clone(),
            });
        }
        Transport::DomainSocket(ds) => {
            object.ds_settings = Some(DomainSocketObject {
                path: ds.path.clone(),
                abstract_socket: ds.abstract_socket,
                padding: ds.padding,
            });
        }
    }

    match &stream.security {
        Security::None => {}
        Security::Tls(tls) => object.tls_settings = Some(generate_tls(tls)),
        Security::Xtls(tls) => object.xtls_settings = Some(generate_tls(tls)),
    }

    object.sockopt = stream.sockopt.as_ref().map(generate_sockopt);

    trace!(
        "Encoded stream: network={}, security={}",
        object.network, object.security
    );
    Ok(object)
}

fn check_header_type(
    transport: StreamTransportKind,
    header_type: &str,
) -> Result<(), GenerateError> {
    if HEADER_OBFUSCATION_TYPES.contains(&header_type) {
        Ok(())
    } else {
        Err(GenerateError::UnsupportedHeaderType {
            transport,
            header_type: header_type.to_string(),
        })
    }
}

fn generate_tls(tls: &TlsSettings) -> TlsObject {
    TlsObject {
        server_name: tls.server_name.clone().filter(|s| !s.is_empty()),
        alpn: tls.alpn.clone(),
        allow_insecure: tls.allow_insecure,
        enable_session_resumption: tls.enable_session_resumption,
        disable_system_root: tls.disable_system_root,
        certificates: tls
            .certificates
            .iter()
            .map(|cert| CertificateObject {
                usage: cert.usage.as_str().to_string(),
                certificate_file: cert.certificate_file.clone(),
                key_file: cert.key_file.clone(),
                certificate: cert.certificate.clone(),
                key: cert.key.clone(),
            })
            .collect(),
    }
}

fn generate_sockopt(sockopt: &SockOpt) -> SockoptObject {
    SockoptObject {
        mark: sockopt.mark,
        tcp_fast_open: sockopt.tcp_fast_open,
        tproxy: sockopt.tproxy.map(|mode| mode.as_str().to_string()),
    }
}
