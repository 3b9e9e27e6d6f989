//! Error types for glance-http.

use std::fmt;

/// Result type alias for glance-http operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for glance-http operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Build the error raised for a failure (or unfollowable) response.
    pub(crate) fn from_response(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(ErrorKind::Http {
            class: HttpErrorClass::from_status(status),
            status,
            reason: reason.into(),
            body: body.into(),
        })
    }

    /// HTTP status carried by a response-derived error.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classification of a response-derived error.
    pub fn http_class(&self) -> Option<HttpErrorClass> {
        match &self.kind {
            ErrorKind::Http { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// Response body text carried by a response-derived error.
    pub fn body(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns true if the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.http_class() == Some(HttpErrorClass::NotFound)
    }

    /// Returns true if the server answered 401.
    pub fn is_unauthorized(&self) -> bool {
        self.http_class() == Some(HttpErrorClass::Unauthorized)
    }

    /// Returns true for transport-level failures (refused, reset, timeout, TLS).
    pub fn is_communication(&self) -> bool {
        matches!(self.kind, ErrorKind::Communication(_))
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Endpoint URL unparsable, host unresolvable, or host/port rejected.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Socket-level failure other than name resolution.
    #[error("Communication error: {0}")]
    Communication(String),

    /// A certificate, private key or CA bundle could not be loaded.
    #[error("SSL configuration error: {0}")]
    SslConfiguration(String),

    /// The server answered with a failure status.
    #[error("HTTP {status} {reason} ({class}): {body}")]
    Http {
        class: HttpErrorClass,
        status: u16,
        reason: String,
        body: String,
    },

    /// More redirects than `ClientConfig::max_redirects` allows.
    #[error("Redirect limit of {limit} exceeded")]
    RedirectLimit { limit: u32 },

    /// A request body could not be serialized.
    #[error("JSON error: {0}")]
    Json(String),

    /// The HTTP layer refused the request (bad header name or value).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP layer could not be configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Response-derived error classes, keyed by status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorClass {
    MultipleChoices,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    OverLimit,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    /// Any status without a dedicated class.
    Other,
}

impl HttpErrorClass {
    /// Map a status code to its class.
    pub fn from_status(status: u16) -> Self {
        match status {
            300 => Self::MultipleChoices,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            409 => Self::Conflict,
            413 => Self::OverLimit,
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            _ => Self::Other,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoices => "multiple choices",
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::MethodNotAllowed => "method not allowed",
            Self::Conflict => "conflict",
            Self::OverLimit => "over limit",
            Self::InternalServerError => "internal server error",
            Self::NotImplemented => "not implemented",
            Self::BadGateway => "bad gateway",
            Self::ServiceUnavailable => "service unavailable",
            Self::Other => "http error",
        }
    }
}

impl fmt::Display for HttpErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
