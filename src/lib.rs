//! # glance-client
//!
//! An image service API client library for Rust.
//!
//! The request engine lives in the `glance-http` crate and is re-exported
//! here as [`http`], with its commonly used types at the top level.
//!
//! ## Security
//!
//! - Auth tokens are redacted in Debug output
//! - Certificate verification is on unless explicitly disabled
//! - Request transcripts (which include the token) are only emitted when
//!   tracing is enabled in the configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use glance_client::{ClientConfig, HttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .with_token(std::env::var("OS_AUTH_TOKEN")?)
//!         .with_ca_file("/etc/ssl/certs/cloud-ca.pem")
//!         .build();
//!     let client = HttpClient::new("https://images.example.com:9292/v2", config)?;
//!
//!     let (_, images) = client.json_request(client.get("/images")).await?;
//!     if let Some(images) = images {
//!         for image in images["images"].as_array().into_iter().flatten() {
//!             println!("{} {}", image["id"], image["name"]);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#[cfg(feature = "http")]
pub use glance_http as http;

#[cfg(feature = "http")]
pub use glance_http::{
    ClientConfig, Error, ErrorKind, HttpClient, HttpErrorClass, RequestSpec, ResponseBodyIterator,
    ResponseHandle, Result,
};
