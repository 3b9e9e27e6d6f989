//! Per-request connections.
//!
//! A [`Connection`] is built for every request (and every redirect hop) and
//! consumed by [`Connection::send`]. Nothing is pooled or reused.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::config::{ClientConfig, TlsOptions};
use crate::error::{Error, ErrorKind, Result};
use crate::request::RequestMethod;
use crate::tls;

/// Kind of connection used for an endpoint scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionClass {
    Plain,
    Tls,
}

impl ConnectionClass {
    /// `https` selects TLS; every other scheme is sent in plain text.
    pub fn select(scheme: &str) -> Self {
        if scheme == "https" {
            Self::Tls
        } else {
            Self::Plain
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Self::Plain => "http",
            Self::Tls => "https",
        }
    }
}

/// Options handed to a new [`Connection`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Receive timeout in whole seconds; `None` disables it.
    pub timeout: Option<Duration>,
    /// TLS options; only present for `https`.
    pub tls: Option<TlsOptions>,
}

impl ConnectionOptions {
    pub fn build(scheme: &str, config: &ClientConfig) -> Self {
        let tls = match ConnectionClass::select(scheme) {
            ConnectionClass::Tls => Some(config.tls.clone()),
            ConnectionClass::Plain => None,
        };
        Self {
            timeout: config.receive_timeout(),
            tls,
        }
    }
}

/// A single-use connection to one host and port.
#[derive(Debug)]
pub struct Connection {
    class: ConnectionClass,
    host: String,
    port: u16,
    timeout: Option<Duration>,
    tls: Option<rustls::ClientConfig>,
}

impl Connection {
    /// Prepare a connection. The TLS context is built here, before any
    /// network activity, so certificate problems surface first.
    pub fn new(
        class: ConnectionClass,
        host: impl Into<String>,
        port: u16,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let host = host.into();
        if host.is_empty() || port == 0 {
            return Err(Error::new(ErrorKind::InvalidEndpoint(format!(
                "invalid host or port: {host:?}:{port}"
            ))));
        }

        let tls = match class {
            ConnectionClass::Tls => {
                let options = options.tls.unwrap_or_default();
                Some(tls::build_context(&options)?)
            }
            ConnectionClass::Plain => None,
        };

        Ok(Self {
            class,
            host,
            port,
            timeout: options.timeout,
            tls,
        })
    }

    pub fn class(&self) -> ConnectionClass {
        self.class
    }

    /// `scheme://host:port` of this connection.
    pub fn origin(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}://{}:{}", self.class.scheme(), host, self.port)
    }

    /// Resolve the host, connect and send one request. Returns once the
    /// response head has arrived; the body is left on the wire.
    pub async fn send(
        self,
        method: RequestMethod,
        path: &str,
        headers: &HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response> {
        let origin = self.origin();
        let url = format!("{origin}{path}");

        let addrs = self.resolve(&url).await?;
        debug!(host = %self.host, port = self.port, ?addrs, "Resolved host");

        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .http1_only()
            .no_proxy()
            .resolve_to_addrs(&self.host, &addrs);
        if let Some(timeout) = self.timeout {
            builder = builder.connect_timeout(timeout).read_timeout(timeout);
        }
        if let Some(tls) = self.tls {
            builder = builder.use_preconfigured_tls(tls);
        }
        let client = builder
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        let mut request = client
            .request(method.to_reqwest(), &url)
            .headers(header_map(headers)?);
        if let Some(body) = body {
            request = request.body(body);
        }

        request.send().await.map_err(|e| {
            if e.is_builder() {
                Error::with_source(ErrorKind::InvalidRequest(e.to_string()), e)
            } else {
                let message = format!("Error communicating with {origin} {e}");
                Error::with_source(ErrorKind::Communication(message), e)
            }
        })
    }

    async fn resolve(&self, url: &str) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::InvalidEndpoint(format!("Error finding address for {url}: {e}")),
                    e,
                )
            })?
            .collect();
        if addrs.is_empty() {
            return Err(Error::new(ErrorKind::InvalidEndpoint(format!(
                "Error finding address for {url}: no addresses"
            ))));
        }
        Ok(addrs)
    }
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            Error::with_source(
                ErrorKind::InvalidRequest(format!("invalid header name {name:?}")),
                e,
            )
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            Error::with_source(
                ErrorKind::InvalidRequest(format!("invalid value for header {name}")),
                e,
            )
        })?;
        map.append(name, value);
    }
    Ok(map)
}
