//! Client TLS configuration.

use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, ring, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::error::TlsError;

/// Produces the TLS configuration used to dial the server.
pub trait TlsConfigProvider: Send + Sync {
    /// Build a client configuration.
    ///
    /// `cert_file` may be empty, in which case the provider chooses its
    /// own trust roots.
    fn client_config(
        &self,
        insecure_skip_verify: bool,
        cert_file: &Path,
    ) -> Result<Arc<ClientConfig>, TlsError>;
}

/// Default provider backed by PEM certificate files.
///
/// - empty `cert_file`: trust the webpki root set
/// - otherwise: trust exactly the certificates in `cert_file`
/// - `insecure_skip_verify`: accept any server certificate
#[derive(Debug, Default, Clone, Copy)]
pub struct PemTlsConfig;

impl TlsConfigProvider for PemTlsConfig {
    fn client_config(
        &self,
        insecure_skip_verify: bool,
        cert_file: &Path,
    ) -> Result<Arc<ClientConfig>, TlsError> {
        let provider = Arc::new(ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?;

        let config = if insecure_skip_verify {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
                .with_no_client_auth()
        } else {
            builder
                .with_root_certificates(load_roots(cert_file)?)
                .with_no_client_auth()
        };
        Ok(Arc::new(config))
    }
}

fn load_roots(cert_file: &Path) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    if cert_file.as_os_str().is_empty() {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        return Ok(roots);
    }

    let pem = std::fs::read(cert_file).map_err(|source| TlsError::CertFile {
        path: cert_file.to_path_buf(),
        source,
    })?;
    // Malformed PEM sections are skipped; an empty result is an error below.
    for cert in CertificateDer::pem_slice_iter(&pem).flatten() {
        roots.add(cert)?;
    }
    if roots.is_empty() {
        return Err(TlsError::NoCertificates(cert_file.to_path_buf()));
    }
    Ok(roots)
}

/// Resolve `host` into the name presented during the handshake.
pub fn server_name(host: &str) -> Result<ServerName<'static>, TlsError> {
    ServerName::try_from(host.to_owned()).map_err(|_| TlsError::InvalidServerName(host.to_owned()))
}

/// Accepts any certificate; handshake signatures are still verified.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
