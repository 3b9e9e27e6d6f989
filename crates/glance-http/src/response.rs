//! Response head returned alongside the body.

use reqwest::Version;

/// Status line and headers of one response.
///
/// Every header value the server sent is kept. Per-name value order is kept;
/// values of one name are grouped, so the relative order of different names
/// may differ from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHandle {
    pub status: u16,
    pub reason: String,
    pub version: Version,
    pub headers: Vec<(String, String)>,
}

impl ResponseHandle {
    /// Capture the head of a live response.
    pub(crate) fn from_reqwest(response: &reqwest::Response) -> Self {
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Self {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            version: response.version(),
            headers,
        }
    }

    /// First value of a header (ASCII case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header, in the order received.
    pub fn header_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the Location header.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The response dump logged in verbose mode: status line, headers, and
    /// the body when one was buffered.
    pub fn dump(&self, body: Option<&str>) -> String {
        let mut lines = vec![format!("\n{:?} {} {}", self.version, self.status, self.reason)];
        lines.extend(self.headers.iter().map(|(k, v)| format!("{k}: {v}")));
        lines.push(String::new());
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            lines.push(body.to_string());
            lines.push(String::new());
        }
        lines.join("\n")
    }
}
