//! TLS behavior against a local server with a self-signed certificate.

use std::io::Write;
use std::sync::Arc;

use glance_http::{ClientConfig, ErrorKind, HttpClient};
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls;
use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::TlsAcceptor;

const BODY: &[u8] = br#"{"ok":true}"#;

struct TestServer {
    port: u16,
    cert_pem: String,
    key_pem: String,
}

impl TestServer {
    fn endpoint(&self) -> String {
        format!("https://localhost:{}", self.port)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serve one JSON document over TLS to every connection.
async fn start_server() -> TestServer {
    init_tracing();

    let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_der = generated.cert.der().clone();
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(generated.key_pair.serialize_der()));

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::aws_lc_rs::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![cert_der], key_der)
    .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(stream).await else {
                    return;
                };

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tls.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    BODY.len()
                );
                let _ = tls.write_all(head.as_bytes()).await;
                let _ = tls.write_all(BODY).await;
                let _ = tls.shutdown().await;
            });
        }
    });

    TestServer {
        port,
        cert_pem: generated.cert.pem(),
        key_pem: generated.key_pair.serialize_pem(),
    }
}

fn pem_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_insecure_accepts_self_signed_server() {
    let server = start_server().await;
    let client = HttpClient::new(
        server.endpoint(),
        ClientConfig::builder().with_insecure(true).build(),
    )
    .unwrap();

    let (handle, value) = client.json_request(client.get("/images")).await.unwrap();
    assert_eq!(handle.status, 200);
    assert_eq!(value, Some(serde_json::json!({"ok": true})));
}

#[tokio::test]
async fn test_secure_rejects_self_signed_server() {
    let server = start_server().await;
    let client = HttpClient::new(server.endpoint(), ClientConfig::default()).unwrap();

    let err = client.json_request(client.get("/images")).await.unwrap_err();
    assert!(err.is_communication(), "expected Communication, got {err}");
}

#[tokio::test]
async fn test_ca_file_trusts_server() {
    let server = start_server().await;
    let ca = pem_file(&server.cert_pem);
    let client = HttpClient::new(
        server.endpoint(),
        ClientConfig::builder().with_ca_file(ca.path()).build(),
    )
    .unwrap();

    let (handle, _) = client.json_request(client.get("/images")).await.unwrap();
    assert_eq!(handle.status, 200);
}

#[tokio::test]
async fn test_insecure_wins_over_unrelated_ca_file() {
    let server = start_server().await;
    let other = rcgen::generate_simple_self_signed(vec!["other.example.com".to_string()]).unwrap();
    let ca = pem_file(&other.cert.pem());
    let client = HttpClient::new(
        server.endpoint(),
        ClientConfig::builder()
            .with_ca_file(ca.path())
            .with_insecure(true)
            .build(),
    )
    .unwrap();

    let (handle, _) = client.json_request(client.get("/images")).await.unwrap();
    assert_eq!(handle.status, 200);
}

#[tokio::test]
async fn test_combined_cert_and_key_file() {
    let server = start_server().await;
    let combined = pem_file(&format!("{}{}", server.cert_pem, server.key_pem));
    let client = HttpClient::new(
        server.endpoint(),
        ClientConfig::builder()
            .with_cert_file(combined.path())
            .with_insecure(true)
            .build(),
    )
    .unwrap();

    let (handle, _) = client.json_request(client.get("/images")).await.unwrap();
    assert_eq!(handle.status, 200);
}

#[tokio::test]
async fn test_ssl_configuration_errors() {
    let server = start_server().await;
    let cert_only = pem_file(&server.cert_pem);
    let garbage = pem_file("-----BEGIN NOTHING-----\n");

    let cases = [
        (
            ClientConfig::builder()
                .with_cert_file("/nonexistent/client.pem")
                .build(),
            "Unable to load cert from",
        ),
        (
            ClientConfig::builder()
                .with_cert_file(cert_only.path())
                .build(),
            "No key file specified",
        ),
        (
            ClientConfig::builder().with_ca_file(garbage.path()).build(),
            "Unable to load CA",
        ),
    ];

    for (config, expected) in cases {
        let client = HttpClient::new(server.endpoint(), config).unwrap();
        let err = client.json_request(client.get("/images")).await.unwrap_err();
        match err.kind {
            ErrorKind::SslConfiguration(message) => {
                assert!(message.contains(expected), "{message:?} should contain {expected:?}")
            }
            other => panic!("expected SslConfiguration, got {other:?}"),
        }
    }
}
