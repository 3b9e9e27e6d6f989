//! # glance-http
//!
//! Request execution engine for the image service API.
//!
//! This crate provides:
//! - Plain and TLS transports, one fresh connection per request
//! - TLS client certificates, custom CA bundles and an insecure mode
//! - `User-Agent` and `X-Auth-Token` header defaults
//! - Redirect re-issue for `301`, `302` and `305`
//! - JSON request/response encoding
//! - Lazy 64 KiB chunked bodies for `application/octet-stream` downloads
//! - Response-derived errors classified by status
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       HttpClient                            │
//! │  - json_request / raw_request / http_request                │
//! │  - header defaults, curl transcripts, redirects             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Connection                            │
//! │  - plain or TLS (rustls), single use                        │
//! │  - name resolution, receive timeout                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ResponseBodyIterator                       │
//! │  - streamed from the network or buffered in memory          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use glance_http::{ClientConfig, HttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), glance_http::Error> {
//!     let config = ClientConfig::builder().with_token(token).build();
//!     let client = HttpClient::new("https://images.example.com:9292/v2", config)?;
//!
//!     // JSON request
//!     let (_, images) = client.json_request(client.get("/images")).await?;
//!
//!     // Streamed download
//!     let (_, mut body) = client
//!         .raw_request(client.get("/images/abc/file"))
//!         .await?;
//!     while let Some(chunk) = body.next_chunk().await? {
//!         sink.write_all(&chunk).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

mod body;
mod client;
mod config;
mod endpoint;
mod error;
mod request;
mod response;
pub mod tls;
mod transport;

pub use body::{ResponseBodyIterator, CHUNK_SIZE};
pub use client::HttpClient;
pub use config::{ClientConfig, ClientConfigBuilder, TlsOptions, DEFAULT_TIMEOUT};
pub use endpoint::{join_path, EndpointParts};
pub use error::{Error, ErrorKind, HttpErrorClass, Result};
pub use request::{RequestBody, RequestMethod, RequestSpec};
pub use response::ResponseHandle;
pub use transport::{Connection, ConnectionClass, ConnectionOptions};

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("glance-client/", env!("CARGO_PKG_VERSION"));
