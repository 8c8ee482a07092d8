//! crates/session/src/transport.rs
//!
//! Opens the TCP connection to the source and, when TLS material is
//! configured, wraps it in a `rustls` client stream. Everything past this
//! point in the handshake talks to a `Box<dyn ReadWrite>` so the rest of
//! the session doesn't care whether the link is encrypted.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol as SocketProtocol, SockAddr, Socket, Type};

use crate::error::{SessionError, SessionResult};
use crate::options::{SourceAddress, TlsOptions};

/// TCP connect timeout, per `spec.md` §5.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// TCP keepalive interval, per `spec.md` §5.
const KEEPALIVE: Duration = Duration::from_secs(5 * 60);

/// A bidirectional byte stream to the source: either a plain [`TcpStream`]
/// or a `rustls`-wrapped TLS stream over one.
///
/// `set_read_timeout` is the seam the live-stream drain loop uses to poll
/// the socket on a fixed cadence without a second thread: a timed-out read
/// just means "nothing arrived this tick, go send an ack".
pub trait ReadWrite: Read + Write + Send {
    /// Bounds how long the next [`Read::read`] call may block.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl ReadWrite for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

impl ReadWrite for TlsStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.sock.set_read_timeout(timeout)
    }
}

/// Dials `address`, applying the connect timeout and keepalive, then wraps
/// the connection in TLS if `tls` is configured.
///
/// # Errors
///
/// Returns [`SessionError::Network`] if DNS resolution or the TCP connect
/// fails, and [`SessionError::Tls`] if the TLS handshake fails.
pub fn connect(address: &SourceAddress, tls: Option<&TlsOptions>) -> SessionResult<Box<dyn ReadWrite>> {
    let tcp = connect_tcp(address)?;
    match tls {
        Some(tls) => {
            let stream = connect_tls(tcp, &address.host, tls)?;
            Ok(Box::new(stream))
        }
        None => Ok(Box::new(tcp)),
    }
}

fn connect_tcp(address: &SourceAddress) -> SessionResult<TcpStream> {
    let candidates: Vec<SocketAddr> = (address.host.as_str(), address.port)
        .to_socket_addrs()
        .map_err(|error| {
            SessionError::network(format!(
                "could not resolve source address {}:{}: {error}",
                address.host, address.port
            ))
        })?
        .collect();

    let mut last_error = None;
    for candidate in candidates {
        match dial_with_keepalive(candidate) {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = Some(error),
        }
    }

    Err(SessionError::network(format!(
        "failed to connect to {}:{}: {}",
        address.host,
        address.port,
        last_error.map_or_else(|| "no addresses resolved".to_owned(), |error| error.to_string())
    )))
}

fn dial_with_keepalive(target: SocketAddr) -> io::Result<TcpStream> {
    let domain = if target.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(SocketProtocol::TCP))?;
    socket.connect_timeout(&SockAddr::from(target), CONNECT_TIMEOUT)?;
    socket.set_keepalive(true)?;
    socket.set_tcp_keepalive(&socket2::TcpKeepalive::new().with_time(KEEPALIVE))?;
    socket.set_nodelay(true)?;
    Ok(socket.into())
}

/// A TLS stream wrapping a [`TcpStream`], used only when [`TlsOptions`] are
/// supplied — most deployments run replication over a trusted network and
/// skip this path entirely.
type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

fn connect_tls(tcp: TcpStream, host: &str, tls: &TlsOptions) -> SessionResult<TlsStream> {
    let config = build_client_config(tls)?;
    let server_name = rustls::pki_types::ServerName::try_from(host.to_owned())
        .map_err(|error| SessionError::Tls(format!("invalid server name {host:?}: {error}")))?;
    let connection = rustls::ClientConnection::new(Arc::new(config), server_name)
        .map_err(|error| SessionError::Tls(error.to_string()))?;
    Ok(rustls::StreamOwned::new(connection, tcp))
}

fn build_client_config(tls: &TlsOptions) -> SessionResult<rustls::ClientConfig> {
    if tls.insecure_skip_verify {
        let builder = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate));
        return attach_client_auth(builder, tls);
    }

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    if let Some(ca_file) = &tls.ca_file {
        let pem = std::fs::read(ca_file)?;
        let certs: Vec<_> = rustls_pemfile::certs(&mut pem.as_slice())
            .collect::<Result<_, _>>()
            .map_err(|error| SessionError::Tls(format!("invalid CA file {ca_file:?}: {error}")))?;
        let (added, _ignored) = roots.add_parsable_certificates(certs);
        if added == 0 {
            return Err(SessionError::Tls(format!(
                "CA file {ca_file:?} contained no usable certificates"
            )));
        }
    }

    attach_client_auth(rustls::ClientConfig::builder().with_root_certificates(roots), tls)
}

/// Both `build_client_config` branches reach this same typestate (the
/// builder is ready to decide client auth) despite arriving via different
/// verifier-setup calls, so this is generic over that shared next step.
fn attach_client_auth(
    builder: rustls::ConfigBuilder<rustls::ClientConfig, rustls::client::WantsClientCert>,
    tls: &TlsOptions,
) -> SessionResult<rustls::ClientConfig> {
    match (&tls.client_cert_file, &tls.client_key_file) {
        (Some(cert_file), Some(key_file)) => {
            let cert_pem = std::fs::read(cert_file)?;
            let certs: Vec<_> = rustls_pemfile::certs(&mut cert_pem.as_slice())
                .collect::<Result<_, _>>()
                .map_err(|error| SessionError::Tls(format!("invalid client cert: {error}")))?;
            let key_pem = std::fs::read(key_file)?;
            let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
                .map_err(|error| SessionError::Tls(format!("invalid client key: {error}")))?
                .ok_or_else(|| SessionError::Tls("client key file contained no key".to_owned()))?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|error| SessionError::Tls(error.to_string()))
        }
        _ => Ok(builder.with_no_client_auth()),
    }
}

#[derive(Debug)]
struct AcceptAnyCertificate;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
