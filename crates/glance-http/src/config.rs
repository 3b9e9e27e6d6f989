//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default receive timeout (600 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration for the HTTP client.
///
/// Built once through [`ClientConfig::builder`] and never mutated by the
/// client afterwards.
#[derive(Clone)]
pub struct ClientConfig {
    /// Auth token sent as `X-Auth-Token`.
    pub token: Option<String>,
    /// Socket receive timeout.
    ///
    /// Applied with whole-second granularity: sub-second parts are
    /// truncated, and a value that truncates to zero disables the timeout.
    pub timeout: Duration,
    /// TLS options, used for `https` endpoints only.
    pub tls: TlsOptions,
    /// User-Agent header value, sent unless the caller supplies one.
    pub user_agent: String,
    /// Emit curl transcripts and response dumps as debug records.
    ///
    /// These records contain the auth token and request/response bodies.
    pub enable_tracing: bool,
    /// Maximum number of redirects followed by one call. `None` follows
    /// redirects without limit.
    pub max_redirects: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsOptions::default(),
            user_agent: crate::USER_AGENT.to_string(),
            enable_tracing: false,
            max_redirects: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("tls", &self.tls)
            .field("user_agent", &self.user_agent)
            .field("enable_tracing", &self.enable_tracing)
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new client config builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// The receive timeout as applied to the socket, truncated to whole
    /// seconds. `None` when it truncates to zero.
    pub fn receive_timeout(&self) -> Option<Duration> {
        match self.timeout.as_secs() {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the auth token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the receive timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the receive timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout = Duration::from_secs(secs);
        self
    }

    /// Trust only the CA certificates in this PEM file.
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.ca_file = Some(path.into());
        self
    }

    /// Present the client certificate in this PEM file.
    ///
    /// Without [`with_key_file`](Self::with_key_file), the private key is
    /// read from the same file.
    pub fn with_cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.cert_file = Some(path.into());
        self
    }

    /// Read the client private key from this PEM file.
    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.key_file = Some(path.into());
        self
    }

    /// Skip server certificate verification. Wins over any CA file.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.config.tls.insecure = insecure;
        self
    }

    /// Allow or forbid TLS-level compression.
    pub fn with_ssl_compression(mut self, enabled: bool) -> Self {
        self.config.tls.ssl_compression = enabled;
        self
    }

    /// Set the whole TLS option block.
    pub fn with_tls_options(mut self, tls: TlsOptions) -> Self {
        self.config.tls = tls;
        self
    }

    /// Set custom User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable or disable request/response transcripts.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.config.enable_tracing = enabled;
        self
    }

    /// Cap the number of redirects followed by one call.
    pub fn with_max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = Some(max);
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// TLS options for `https` endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// PEM bundle of trusted CA certificates. Platform roots when unset.
    pub ca_file: Option<PathBuf>,
    /// PEM client certificate chain, optionally followed by its key.
    pub cert_file: Option<PathBuf>,
    /// PEM client private key.
    pub key_file: Option<PathBuf>,
    /// Skip server certificate verification.
    pub insecure: bool,
    /// Allow TLS-level compression.
    pub ssl_compression: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            ca_file: None,
            cert_file: None,
            key_file: None,
            insecure: false,
            ssl_compression: true,
        }
    }
}
