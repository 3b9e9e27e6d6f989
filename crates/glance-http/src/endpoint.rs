//! Endpoint URL parsing and request path composition.

use url::{Host, Url};

use crate::error::{Error, ErrorKind, Result};

/// Scheme, host, port and base path of a service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointParts {
    pub scheme: String,
    /// Host name or IP literal, without IPv6 brackets.
    pub hostname: String,
    pub port: u16,
    /// Base path, without a trailing separator (empty for the root).
    pub path: String,
}

impl EndpointParts {
    /// Parse an endpoint URL.
    ///
    /// Fails with `InvalidEndpoint` when the URL has no scheme or no host.
    /// The port defaults to 443 for `https` and 80 for any other scheme.
    pub fn parse(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|e| {
            Error::with_source(ErrorKind::InvalidEndpoint(format!("{endpoint}: {e}")), e)
        })?;
        Self::from_url(&url).ok_or_else(|| {
            Error::new(ErrorKind::InvalidEndpoint(format!(
                "{endpoint}: no host in endpoint URL"
            )))
        })
    }

    fn from_url(url: &Url) -> Option<Self> {
        let hostname = match url.host()? {
            Host::Domain(domain) if domain.is_empty() => return None,
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => ip.to_string(),
        };
        let scheme = url.scheme().to_string();
        let default_port = if scheme == "https" { 443 } else { 80 };
        Some(Self {
            port: url.port().unwrap_or(default_port),
            path: url.path().trim_end_matches('/').to_string(),
            scheme,
            hostname,
        })
    }

    /// Split an absolute redirect target into endpoint parts (with an empty
    /// base path) and the path plus query to request there.
    ///
    /// Returns `None` for relative locations.
    pub fn split_location(location: &str) -> Option<(Self, String)> {
        let url = Url::parse(location).ok()?;
        let mut parts = Self::from_url(&url)?;
        parts.path.clear();
        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }
        Some((parts, target))
    }

    /// Host as it appears in a URL authority (IPv6 literals bracketed).
    pub fn url_host(&self) -> String {
        if self.hostname.contains(':') {
            format!("[{}]", self.hostname)
        } else {
            self.hostname.clone()
        }
    }

    /// `scheme://host:port`.
    pub fn origin(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.url_host(), self.port)
    }
}

/// Join an endpoint base path and a relative request URL.
///
/// This is segment normalization over `/`-separated strings, never a
/// filesystem operation: empty and `.` segments are dropped, `..` removes
/// the previous segment (never climbing above the root) and trailing
/// separators disappear. The result is always absolute. A query string in
/// `relative` is appended untouched.
pub fn join_path(base: &str, relative: &str) -> String {
    let (relative_path, query) = match relative.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (relative, None),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(relative_path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if let Some(query) = query {
        path.push('?');
        path.push_str(query);
    }
    path
}
