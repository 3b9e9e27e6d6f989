//! TLS context construction for `https` connections.
//!
//! Every connection gets a fresh `rustls` client configuration built from
//! [`TlsOptions`]. Server certificates always go through
//! [`PassThroughVerifier`], which forwards to the webpki chain validation and
//! only decides what to do with its verdict.

use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, warn};

use crate::config::TlsOptions;
use crate::error::{Error, ErrorKind, Result};

/// What the verifier does with the chain validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Reject the handshake when validation fails.
    Peer,
    /// Log validation failures and continue.
    None,
}

/// Server certificate verifier that delegates chain validation to
/// [`WebPkiServerVerifier`] and never rejects on its own.
#[derive(Debug)]
pub struct PassThroughVerifier {
    inner: Option<Arc<WebPkiServerVerifier>>,
    mode: VerifyMode,
    provider: Arc<CryptoProvider>,
}

impl PassThroughVerifier {
    fn new(roots: RootCertStore, mode: VerifyMode, provider: Arc<CryptoProvider>) -> Result<Self> {
        let inner = match WebPkiServerVerifier::builder_with_provider(
            Arc::new(roots),
            provider.clone(),
        )
        .build()
        {
            Ok(verifier) => Some(verifier),
            // Without roots nothing can validate, which only matters when
            // the result is enforced.
            Err(e) if mode == VerifyMode::None => {
                debug!(error = %e, "No usable trust anchors, chain validation skipped");
                None
            }
            Err(e) => {
                return Err(Error::with_source(
                    ErrorKind::SslConfiguration(format!("Unable to build certificate verifier {e}")),
                    e,
                ))
            }
        };
        Ok(Self {
            inner,
            mode,
            provider,
        })
    }

    pub fn mode(&self) -> VerifyMode {
        self.mode
    }
}

impl ServerCertVerifier for PassThroughVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let verdict = match &self.inner {
            Some(inner) => {
                inner.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
            }
            None => Err(rustls::Error::General("no trust anchors".to_string())),
        };

        match self.mode {
            VerifyMode::Peer => verdict,
            VerifyMode::None => {
                if let Err(e) = verdict {
                    debug!(server = ?server_name, error = %e, "Ignoring certificate verification failure");
                }
                Ok(ServerCertVerified::assertion())
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build the client TLS configuration for one connection.
///
/// Fails with `SslConfiguration` when a certificate, key or CA file cannot
/// be loaded, or when the certificate and key do not belong together.
pub fn build_context(options: &TlsOptions) -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

    // rustls never negotiates TLS compression.
    debug!(
        ssl_compression = options.ssl_compression,
        insecure = options.insecure,
        "Building TLS context"
    );

    let roots = match &options.ca_file {
        Some(path) => load_ca_file(path)?,
        None => platform_roots(),
    };
    let mode = if options.insecure {
        VerifyMode::None
    } else {
        VerifyMode::Peer
    };
    let verifier = PassThroughVerifier::new(roots, mode, provider.clone())?;

    let builder = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| {
            Error::with_source(
                ErrorKind::SslConfiguration(format!("Unable to negotiate protocol versions {e}")),
                e,
            )
        })?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier));

    let identity = match (&options.cert_file, &options.key_file) {
        (Some(cert_path), key_path) => {
            let certs = load_cert_chain(cert_path)?;
            let key = match key_path {
                Some(key_path) => load_private_key(key_path)?,
                None => PrivateKeyDer::from_pem_file(cert_path).map_err(|e| {
                    Error::with_source(
                        ErrorKind::SslConfiguration(format!(
                            "No key file specified and unable to load key from \"{}\" {e}",
                            cert_path.display()
                        )),
                        e,
                    )
                })?,
            };
            Some((certs, key, key_path.as_deref().unwrap_or(cert_path)))
        }
        (None, Some(key_path)) => {
            load_private_key(key_path)?;
            warn!(
                key_file = %key_path.display(),
                "Private key given without a certificate, no client certificate will be presented"
            );
            None
        }
        (None, None) => None,
    };

    match identity {
        Some((certs, key, key_path)) => builder.with_client_auth_cert(certs, key).map_err(|e| {
            Error::with_source(
                ErrorKind::SslConfiguration(format!(
                    "Unable to load key from \"{}\" {e}",
                    key_path.display()
                )),
                e,
            )
        }),
        None => Ok(builder.with_no_client_auth()),
    }
}

fn load_cert_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let fail = |detail: String| {
        Error::new(ErrorKind::SslConfiguration(format!(
            "Unable to load cert from \"{}\" {detail}",
            path.display()
        )))
    };

    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| fail(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| fail(e.to_string()))?;
    if certs.is_empty() {
        return Err(fail("no certificates found".to_string()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    PrivateKeyDer::from_pem_file(path).map_err(|e| {
        Error::with_source(
            ErrorKind::SslConfiguration(format!(
                "Unable to load key from \"{}\" {e}",
                path.display()
            )),
            e,
        )
    })
}

fn load_ca_file(path: &Path) -> Result<RootCertStore> {
    let fail = |detail: String| {
        Error::new(ErrorKind::SslConfiguration(format!(
            "Unable to load CA from \"{}\" {detail}",
            path.display()
        )))
    };

    let mut roots = RootCertStore::empty();
    for cert in CertificateDer::pem_file_iter(path).map_err(|e| fail(e.to_string()))? {
        let cert = cert.map_err(|e| fail(e.to_string()))?;
        roots.add(cert).map_err(|e| fail(e.to_string()))?;
    }
    if roots.is_empty() {
        return Err(fail("no certificates found".to_string()));
    }
    Ok(roots)
}

/// Platform trust anchors, or the bundled Mozilla roots when the platform
/// store yields nothing usable.
fn platform_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        debug!(error = %e, "Error loading platform certificate");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!(added, ignored, "Loaded platform trust anchors");

    if roots.is_empty() {
        debug!("Platform trust store empty, using bundled roots");
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Identity {
        cert_pem: String,
        key_pem: String,
    }

    fn identity() -> Identity {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        Identity {
            cert_pem: generated.cert.pem(),
            key_pem: generated.key_pair.serialize_pem(),
        }
    }

    fn pem_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn ssl_message(err: Error) -> String {
        match err.kind {
            ErrorKind::SslConfiguration(message) => message,
            other => panic!("expected SslConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_default_context() {
        let config = build_context(&TlsOptions::default()).unwrap();
        assert!(!config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_insecure_tolerates_ca_file() {
        let id = identity();
        let ca = pem_file(&id.cert_pem);
        let options = TlsOptions {
            ca_file: Some(ca.path().to_path_buf()),
            insecure: true,
            ..TlsOptions::default()
        };
        build_context(&options).unwrap();
    }

    #[test]
    fn test_client_cert_with_separate_key() {
        let id = identity();
        let cert = pem_file(&id.cert_pem);
        let key = pem_file(&id.key_pem);
        let options = TlsOptions {
            cert_file: Some(cert.path().to_path_buf()),
            key_file: Some(key.path().to_path_buf()),
            ..TlsOptions::default()
        };
        let config = build_context(&options).unwrap();
        assert!(config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_client_cert_with_combined_key() {
        let id = identity();
        let combined = pem_file(&format!("{}{}", id.cert_pem, id.key_pem));
        let options = TlsOptions {
            cert_file: Some(combined.path().to_path_buf()),
            ..TlsOptions::default()
        };
        let config = build_context(&options).unwrap();
        assert!(config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_cert_without_key() {
        let id = identity();
        let cert = pem_file(&id.cert_pem);
        let options = TlsOptions {
            cert_file: Some(cert.path().to_path_buf()),
            ..TlsOptions::default()
        };
        let message = ssl_message(build_context(&options).unwrap_err());
        assert!(message.starts_with("No key file specified and unable to load key from"));
    }

    #[test]
    fn test_missing_cert_file() {
        let options = TlsOptions {
            cert_file: Some("/nonexistent/client.pem".into()),
            ..TlsOptions::default()
        };
        let message = ssl_message(build_context(&options).unwrap_err());
        assert!(message.starts_with("Unable to load cert from \"/nonexistent/client.pem\""));
    }

    #[test]
    fn test_key_without_cert_is_validated() {
        let id = identity();
        let key = pem_file(&id.key_pem);
        let options = TlsOptions {
            key_file: Some(key.path().to_path_buf()),
            ..TlsOptions::default()
        };
        let config = build_context(&options).unwrap();
        assert!(!config.client_auth_cert_resolver.has_certs());

        let bad_key = pem_file("not a key");
        let options = TlsOptions {
            key_file: Some(bad_key.path().to_path_buf()),
            ..TlsOptions::default()
        };
        let message = ssl_message(build_context(&options).unwrap_err());
        assert!(message.starts_with("Unable to load key from"));
    }

    #[test]
    fn test_mismatched_key() {
        let id = identity();
        let other = identity();
        let cert = pem_file(&id.cert_pem);
        let key = pem_file(&other.key_pem);
        let options = TlsOptions {
            cert_file: Some(cert.path().to_path_buf()),
            key_file: Some(key.path().to_path_buf()),
            ..TlsOptions::default()
        };
        let message = ssl_message(build_context(&options).unwrap_err());
        assert!(message.starts_with("Unable to load key from"));
    }

    #[test]
    fn test_bad_ca_file() {
        let garbage = pem_file("this is not a certificate bundle\n");
        let options = TlsOptions {
            ca_file: Some(garbage.path().to_path_buf()),
            ..TlsOptions::default()
        };
        let message = ssl_message(build_context(&options).unwrap_err());
        assert!(message.starts_with("Unable to load CA from"));

        let options = TlsOptions {
            ca_file: Some("/nonexistent/ca.pem".into()),
            ..TlsOptions::default()
        };
        let message = ssl_message(build_context(&options).unwrap_err());
        assert!(message.starts_with("Unable to load CA from"));
    }

    #[test]
    fn test_verifier_without_roots() {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

        let verifier =
            PassThroughVerifier::new(RootCertStore::empty(), VerifyMode::None, provider.clone())
                .unwrap();
        assert_eq!(verifier.mode(), VerifyMode::None);
        assert!(verifier.inner.is_none());
        assert!(!verifier.supported_verify_schemes().is_empty());

        let err = PassThroughVerifier::new(RootCertStore::empty(), VerifyMode::Peer, provider)
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::SslConfiguration(_)));
    }

    #[test]
    fn test_platform_roots_never_empty() {
        assert!(!platform_roots().is_empty());
    }
}
