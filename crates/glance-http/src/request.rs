//! Request values passed to the executor.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
    Head,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
            RequestMethod::Head => reqwest::Method::HEAD,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
            RequestMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body content.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized to JSON text before sending.
    Json(serde_json::Value),
    /// Sent as-is.
    Bytes(Bytes),
}

impl RequestBody {
    /// The bytes put on the wire.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            RequestBody::Json(value) => Ok(Bytes::from(serde_json::to_vec(value)?)),
            RequestBody::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// One request: method, URL relative to the endpoint, headers and body.
///
/// The caller's `RequestSpec` is never mutated; header defaults are applied to
/// a copy, so the same value can be re-issued on a redirect.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub(crate) method: RequestMethod,
    pub(crate) url: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Option<RequestBody>,
}

impl RequestSpec {
    /// Create a new request.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add several headers.
    pub fn headers_from<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a JSON body from any serializable value.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    /// Set raw JSON body.
    pub fn json_value(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Set bytes body.
    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self
    }

    /// Set a header unless one with the same name (ASCII case-insensitive)
    /// is already present.
    pub(crate) fn default_header(&mut self, name: &str, value: &str) {
        set_default_header(&mut self.headers, name, value);
    }

    /// The same request against another URL.
    pub(crate) fn redirected_to(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}

pub(crate) fn has_header(headers: &HashMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

pub(crate) fn set_default_header(headers: &mut HashMap<String, String>, name: &str, value: &str) {
    if !has_header(headers, name) {
        headers.insert(name.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_spec() {
        let req = RequestSpec::new(RequestMethod::Get, "/images/detail")
            .header("X-Custom", "value")
            .headers_from([("Accept", "application/json")]);

        assert_eq!(req.method(), RequestMethod::Get);
        assert_eq!(req.url(), "/images/detail");
        assert_eq!(req.headers().get("X-Custom"), Some(&"value".to_string()));
        assert_eq!(req.headers().len(), 2);
        assert!(req.body().is_none());
    }

    #[test]
    fn test_json_body_serializes_to_json_text() {
        #[derive(Serialize)]
        struct Image<'a> {
            name: &'a str,
            min_disk: u32,
        }

        let req = RequestSpec::new(RequestMethod::Post, "/images")
            .json(&Image {
                name: "cirros",
                min_disk: 1,
            })
            .unwrap();

        let bytes = req.body().unwrap().to_bytes().unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, serde_json::json!({"name": "cirros", "min_disk": 1}));
    }

    #[test]
    fn test_bytes_body_is_sent_as_is() {
        let req = RequestSpec::new(RequestMethod::Put, "/images/abc/file").bytes(vec![0u8, 159, 146, 150]);
        assert_eq!(
            req.body().unwrap().to_bytes().unwrap(),
            Bytes::from_static(&[0, 159, 146, 150])
        );
    }

    #[test]
    fn test_default_header_is_case_insensitive() {
        let mut req = RequestSpec::new(RequestMethod::Get, "/").header("user-agent", "mine/1.0");
        req.default_header("User-Agent", "glance-client/0.1.0");
        req.default_header("X-Auth-Token", "tok");

        assert_eq!(req.headers().len(), 2);
        assert_eq!(req.headers().get("user-agent"), Some(&"mine/1.0".to_string()));
        assert_eq!(req.headers().get("X-Auth-Token"), Some(&"tok".to_string()));
    }

    #[test]
    fn test_redirected_to_keeps_everything_but_url() {
        let req = RequestSpec::new(RequestMethod::Post, "/images")
            .header("X-Custom", "1")
            .bytes(&b"payload"[..]);
        let next = req.redirected_to("/v2/images");

        assert_eq!(next.url(), "/v2/images");
        assert_eq!(next.method(), RequestMethod::Post);
        assert_eq!(next.headers(), req.headers());
        assert_eq!(next.body(), req.body());
        assert_eq!(req.url(), "/images");
    }

    #[test]
    fn test_method_display() {
        assert_eq!(RequestMethod::Delete.to_string(), "DELETE");
        assert_eq!(RequestMethod::Patch.to_reqwest(), reqwest::Method::PATCH);
    }
}
