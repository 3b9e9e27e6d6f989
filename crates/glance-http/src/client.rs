//! Request executor: header defaults, transport, body handling, status
//! classification and redirects.

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, error, instrument};

use crate::body::ResponseBodyIterator;
use crate::config::ClientConfig;
use crate::endpoint::{join_path, EndpointParts};
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBody, RequestMethod, RequestSpec};
use crate::response::ResponseHandle;
use crate::transport::{Connection, ConnectionClass, ConnectionOptions};

const OCTET_STREAM: &str = "application/octet-stream";
const APPLICATION_JSON: &str = "application/json";

/// HTTP client for one image service endpoint.
///
/// Every request opens its own connection; cloning the client is cheap and
/// clones share nothing mutable.
#[derive(Debug, Clone)]
pub struct HttpClient {
    endpoint: String,
    parts: EndpointParts,
    config: ClientConfig,
}

impl HttpClient {
    /// Create a client for `endpoint`.
    ///
    /// Fails with `InvalidEndpoint` when the URL lacks a scheme or host.
    pub fn new(endpoint: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let endpoint = endpoint.into();
        let parts = EndpointParts::parse(&endpoint)?;
        Ok(Self {
            endpoint,
            parts,
            config,
        })
    }

    /// The endpoint URL as given.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn endpoint_parts(&self) -> &EndpointParts {
        &self.parts
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a GET request.
    pub fn get(&self, url: impl Into<String>) -> RequestSpec {
        RequestSpec::new(RequestMethod::Get, url)
    }

    /// Create a POST request.
    pub fn post(&self, url: impl Into<String>) -> RequestSpec {
        RequestSpec::new(RequestMethod::Post, url)
    }

    /// Create a PUT request.
    pub fn put(&self, url: impl Into<String>) -> RequestSpec {
        RequestSpec::new(RequestMethod::Put, url)
    }

    /// Create a PATCH request.
    pub fn patch(&self, url: impl Into<String>) -> RequestSpec {
        RequestSpec::new(RequestMethod::Patch, url)
    }

    /// Create a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> RequestSpec {
        RequestSpec::new(RequestMethod::Delete, url)
    }

    /// Create a HEAD request.
    pub fn head(&self, url: impl Into<String>) -> RequestSpec {
        RequestSpec::new(RequestMethod::Head, url)
    }

    /// Send a request and return the response head and body.
    ///
    /// `301`, `302` and `305` responses are followed on a new connection.
    /// `300` and any `4xx`/`5xx` status are returned as errors carrying the
    /// response body. Bodies are buffered in memory unless the response is
    /// `application/octet-stream`.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn http_request(
        &self,
        request: &RequestSpec,
    ) -> Result<(ResponseHandle, ResponseBodyIterator)> {
        self.dispatch(self.parts.clone(), request.clone(), 0).await
    }

    /// Send a request with a JSON body (`Content-Type` defaults to
    /// `application/json`) and decode a JSON response.
    ///
    /// The decoded value is `None` when the response is not JSON, is empty,
    /// or cannot be parsed.
    pub async fn json_request(
        &self,
        mut request: RequestSpec,
    ) -> Result<(ResponseHandle, Option<serde_json::Value>)> {
        request.default_header("Content-Type", APPLICATION_JSON);
        let (handle, body) = self.http_request(&request).await?;

        let is_json = handle
            .content_type()
            .is_some_and(|ct| ct.contains(APPLICATION_JSON));
        if !is_json {
            return Ok((handle, None));
        }

        let bytes = body.collect_bytes().await?;
        if bytes.is_empty() {
            return Ok((handle, None));
        }
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok((handle, Some(value))),
            Err(e) => {
                error!(error = %e, "Could not decode response body as JSON");
                Ok((handle, None))
            }
        }
    }

    /// Send a request with a raw body (`Content-Type` defaults to
    /// `application/octet-stream`) and hand back the body iterator.
    pub async fn raw_request(
        &self,
        mut request: RequestSpec,
    ) -> Result<(ResponseHandle, ResponseBodyIterator)> {
        request.default_header("Content-Type", OCTET_STREAM);
        self.http_request(&request).await
    }

    fn dispatch(
        &self,
        target: EndpointParts,
        mut request: RequestSpec,
        redirects: u32,
    ) -> BoxFuture<'_, Result<(ResponseHandle, ResponseBodyIterator)>> {
        async move {
            request.default_header("User-Agent", &self.config.user_agent);
            if let Some(token) = &self.config.token {
                request.default_header("X-Auth-Token", token);
            }

            let body = request.body.as_ref().map(RequestBody::to_bytes).transpose()?;
            let path = join_path(&target.path, &request.url);
            let origin = target.origin();

            if self.config.enable_tracing {
                debug!("{}", self.curl_command(&request, &format!("{origin}{path}"), body.as_ref()));
            }

            let connection = Connection::new(
                ConnectionClass::select(&target.scheme),
                target.hostname.as_str(),
                target.port,
                ConnectionOptions::build(&target.scheme, &self.config),
            )?;
            let response = connection
                .send(request.method, &path, &request.headers, body)
                .await?;

            let handle = ResponseHandle::from_reqwest(&response);
            let mut body = ResponseBodyIterator::from_network(response, origin);

            if handle.content_type() == Some(OCTET_STREAM) {
                if self.config.enable_tracing {
                    debug!("{}", handle.dump(None));
                }
            } else {
                body = body.buffer().await?;
                if self.config.enable_tracing {
                    let text = body
                        .buffered()
                        .map(|data| String::from_utf8_lossy(data).into_owned());
                    debug!("{}", handle.dump(text.as_deref()));
                }
            }

            match handle.status {
                400..=599 => {
                    error!(status = handle.status, "Request returned failure status.");
                    Err(response_error(&handle, body).await)
                }
                301 | 302 | 305 => {
                    let Some(location) = handle.location().map(str::to_string) else {
                        return Err(response_error(&handle, body).await);
                    };
                    if let Some(limit) = self.config.max_redirects {
                        if redirects >= limit {
                            return Err(Error::new(ErrorKind::RedirectLimit { limit }));
                        }
                    }
                    debug!(status = handle.status, %location, "Following redirect");

                    let (next_target, next_url) = match EndpointParts::split_location(&location) {
                        Some((parts, url)) => (parts, url),
                        None => (target, location),
                    };
                    self.dispatch(next_target, request.redirected_to(next_url), redirects + 1)
                        .await
                }
                300 => Err(response_error(&handle, body).await),
                _ => Ok((handle, body)),
            }
        }
        .boxed()
    }

    /// A `curl` command line reproducing one request.
    fn curl_command(&self, request: &RequestSpec, url: &str, body: Option<&Bytes>) -> String {
        let mut curl = vec![format!("curl -i -X {}", request.method)];

        let mut headers: Vec<_> = request.headers.iter().collect();
        headers.sort();
        curl.extend(headers.into_iter().map(|(k, v)| format!("-H '{k}: {v}'")));

        let tls = &self.config.tls;
        if let Some(path) = &tls.key_file {
            curl.push(format!("--key {}", path.display()));
        }
        if let Some(path) = &tls.cert_file {
            curl.push(format!("--cert {}", path.display()));
        }
        if let Some(path) = &tls.ca_file {
            curl.push(format!("--cacert {}", path.display()));
        }
        if tls.insecure {
            curl.push("-k".to_string());
        }

        if let Some(body) = body.filter(|b| !b.is_empty()) {
            match std::str::from_utf8(body) {
                Ok(text) => curl.push(format!("-d '{text}'")),
                Err(_) => curl.push(format!("-d '<{} bytes of binary data>'", body.len())),
            }
        }

        curl.push(url.to_string());
        curl.join(" ")
    }
}

/// The error for a response that cannot be handed to the caller.
async fn response_error(handle: &ResponseHandle, body: ResponseBodyIterator) -> Error {
    match body.collect_bytes().await {
        Ok(bytes) => Error::from_response(
            handle.status,
            handle.reason.as_str(),
            String::from_utf8_lossy(&bytes),
        ),
        Err(e) => e,
    }
}
