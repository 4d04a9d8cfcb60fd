//! TLS 1.2/1.3 dialer with TOFU fingerprint verification and optional
//! scoped client certificates. CA validation is disabled by design: a
//! custom `ServerCertVerifier` accepts any chain at the handshake layer,
//! and the leaf DER's SHA-256 is checked against the TOFU store
//! immediately after the handshake completes. Hostname verification, when
//! enabled, is a separate check of the leaf's SAN/CN against the dialed
//! host, independent of the CA-less handshake.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use sha2::{Digest, Sha256};
use tokio::net::TcpStream;

use smallweb_core::{Error, Result, TofuOutcome};

use crate::clientcert::ClientCertStore;
use crate::tofu::TofuStore;

#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        // Authentication is TOFU, not CA validation -- see `TlsDialer::connect`,
        // which checks the leaf fingerprint against the TOFU store right
        // after this handshake completes.
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

pub fn leaf_fingerprint(der: &CertificateDer<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(der.as_ref());
    hex::encode(hasher.finalize())
}

/// Check the leaf certificate's SAN/CN against `server_name`, independent of
/// chain validation (which `AcceptAnyServerCert` already skips). Fails
/// closed: any parse or mismatch error is surfaced, never ignored.
fn verify_hostname(leaf: &CertificateDer<'_>, server_name: &ServerName<'_>) -> Result<()> {
    let cert = webpki::EndEntityCert::try_from(leaf)
        .map_err(|e| Error::TlsError(format!("invalid leaf certificate: {e:?}")))?;
    cert.verify_is_valid_for_subject_name(server_name)
        .map_err(|e| Error::TlsError(format!("certificate is not valid for this host: {e:?}")))?;
    Ok(())
}

pub struct TlsDialer {
    tofu: Arc<TofuStore>,
    client_certs: Arc<ClientCertStore>,
    tofu_enabled: bool,
    client_certs_enabled: bool,
    verify_hostname: bool,
}

impl TlsDialer {
    pub fn new(
        tofu: Arc<TofuStore>,
        client_certs: Arc<ClientCertStore>,
        tofu_enabled: bool,
        client_certs_enabled: bool,
        verify_hostname: bool,
    ) -> Self {
        TlsDialer { tofu, client_certs, tofu_enabled, client_certs_enabled, verify_hostname }
    }

    /// Connect, complete the handshake, and verify the leaf fingerprint
    /// against the TOFU store. On a new authority the fingerprint is
    /// pinned immediately (`TrustedNew`); on mismatch or expiry the
    /// connection is reported as failed to the caller, which must not
    /// proceed to read/write application data.
    pub async fn connect(&self, host: &str, port: u16, path: &str) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::NetworkError(format!("connect to {host}:{port} failed: {e}")))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = rustls::ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
            .map_err(|e| Error::TlsError(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert));

        let config = if self.client_certs_enabled {
            match self.client_certs.select(host, port, path) {
                Some(entry) => {
                    let chain = vec![CertificateDer::from(entry.cert_material.clone())];
                    let key = PrivatePkcs8KeyDer::from(entry.key_material.clone());
                    builder
                        .with_client_auth_cert(chain, key.into())
                        .map_err(|e| Error::TlsError(format!("client certificate rejected: {e}")))?
                }
                None => builder.with_no_client_auth(),
            }
        } else {
            builder.with_no_client_auth()
        };

        let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(host.to_string()).map_err(|e| Error::TlsError(e.to_string()))?;
        let stream = connector
            .connect(server_name.clone(), tcp)
            .await
            .map_err(|e| Error::TlsError(format!("handshake with {host}:{port} failed: {e}")))?;

        let (_, conn) = stream.get_ref();
        let peer_certs = conn
            .peer_certificates()
            .ok_or_else(|| Error::TlsError("server presented no certificate".into()))?;
        let leaf = peer_certs.first().ok_or_else(|| Error::TlsError("empty certificate chain".into()))?;

        if self.verify_hostname {
            verify_hostname(leaf, &server_name)?;
        }

        let fingerprint = leaf_fingerprint(leaf);

        if self.tofu_enabled {
            match self.tofu.check(host, port, &fingerprint) {
                TofuOutcome::TrustedNew => {
                    self.tofu
                        .remember(host, port, &fingerprint, None)
                        .map_err(|e| Error::TlsError(format!("failed to persist tofu entry: {e}")))?;
                    tracing::info!(host, port, "tofu: pinned new certificate");
                }
                TofuOutcome::TrustedMatch => {}
                TofuOutcome::Mismatch => {
                    tracing::warn!(host, port, "tofu: certificate fingerprint mismatch");
                    return Err(Error::CertificateMismatch { host: host.to_string(), port });
                }
                TofuOutcome::Expired => {
                    tracing::warn!(host, port, "tofu: pinned certificate entry expired");
                    return Err(Error::CertificateExpired { host: host.to_string(), port });
                }
            }
        }

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clientcert::ClientCertStore;
    use crate::tofu::TofuStore;
    use rcgen::generate_simple_self_signed;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn spawn_tls_echo_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
        let cert = generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_der = CertificateDer::from(cert.cert.der().to_vec());
        let key_der = rustls::pki_types::PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let server_config = rustls::ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS13])
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .unwrap();
        let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(server_config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut tls = acceptor.accept(tcp).await.unwrap();
            let mut buf = [0u8; 5];
            let _ = tls.read_exact(&mut buf).await;
            let _ = tls.write_all(b"hello").await;
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn first_connection_pins_and_succeeds() {
        let (addr, _server) = spawn_tls_echo_server().await;
        let tofu_dir = tempfile::tempdir().unwrap();
        let tofu = Arc::new(TofuStore::load(tofu_dir.path().join("tofu")));
        let certs = Arc::new(ClientCertStore::load(tofu_dir.path()));
        let dialer = TlsDialer::new(tofu.clone(), certs, true, false, true);

        let mut stream = dialer.connect("localhost", addr.port(), "/").await.unwrap();
        stream.write_all(b"ping!").await.unwrap();
        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn hostname_mismatch_is_rejected_when_verification_enabled() {
        // Cert is issued for "example.org" but the dialer connects to
        // "localhost" -- with verification on this must fail closed.
        let cert = generate_simple_self_signed(vec!["example.org".to_string()]).unwrap();
        let cert_der = CertificateDer::from(cert.cert.der().to_vec());
        let key_der = rustls::pki_types::PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let server_config = rustls::ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS13])
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .unwrap();
        let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(server_config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let _ = acceptor.accept(tcp).await;
        });

        let tofu_dir = tempfile::tempdir().unwrap();
        let tofu = Arc::new(TofuStore::load(tofu_dir.path().join("tofu")));
        let certs = Arc::new(ClientCertStore::load(tofu_dir.path()));
        let dialer = TlsDialer::new(tofu, certs, true, false, true);

        let err = dialer.connect("localhost", addr.port(), "/").await.unwrap_err();
        assert!(matches!(err, Error::TlsError(_)));
    }
}
