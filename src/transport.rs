//! HTTP transport seam used for remote schemas and link actions.

use serde_json::Value;

use crate::error::TransportError;
use crate::types::Method;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully resolved HTTP request descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Shorthand for a bodiless GET.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the JSON body.
    pub fn body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response returned by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, TransportError> {
        serde_json::from_str(&self.body).map_err(|source| TransportError::InvalidBody {
            url: self.url.clone(),
            source,
        })
    }
}

/// Verb-named HTTP operations.
///
/// Only the verbs with an operation here can be invoked from a link;
/// see [`Method::is_invocable`].
pub trait Transport {
    fn get(&self, request: &Request) -> Result<Response, TransportError>;
    fn post(&self, request: &Request) -> Result<Response, TransportError>;
    fn put(&self, request: &Request) -> Result<Response, TransportError>;
    fn patch(&self, request: &Request) -> Result<Response, TransportError>;
    fn delete(&self, request: &Request) -> Result<Response, TransportError>;

    /// GET a URL and parse the body as a JSON document.
    fn fetch(&self, url: &str) -> Result<Value, TransportError> {
        self.get(&Request::get(url))?.json()
    }
}

/// [`Transport`] backed by a blocking `reqwest` client.
///
/// Requires the `remote` feature (enabled by default). Non-2xx responses
/// are reported as `TransportError::Status`.
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Option<String>,
    timeout: Duration,
}

#[cfg(feature = "remote")]
impl HttpTransport {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: HTTP_TIMEOUT,
        }
    }

    /// Prefix for relative link URLs (e.g. `/widgets/42`).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL for a request, joining relative paths onto the base URL.
    pub fn absolute_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !crate::loader::is_url(url) => {
                format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }

    fn send(&self, method: reqwest::Method, request: &Request) -> Result<Response, TransportError> {
        let url = self.absolute_url(&request.url);
        let network = |source: reqwest::Error| TransportError::Network {
            url: url.clone(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(network)?;

        let mut builder = client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %url, "sending request");
        let response = builder.send().map_err(network)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(TransportError::Status {
                url: url.clone(),
                status,
            });
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().map_err(network)?;

        Ok(Response {
            url,
            status,
            headers,
            body,
        })
    }
}

#[cfg(feature = "remote")]
impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "remote")]
impl Transport for HttpTransport {
    fn get(&self, request: &Request) -> Result<Response, TransportError> {
        self.send(reqwest::Method::GET, request)
    }

    fn post(&self, request: &Request) -> Result<Response, TransportError> {
        self.send(reqwest::Method::POST, request)
    }

    fn put(&self, request: &Request) -> Result<Response, TransportError> {
        self.send(reqwest::Method::PUT, request)
    }

    fn patch(&self, request: &Request) -> Result<Response, TransportError> {
        self.send(reqwest::Method::PATCH, request)
    }

    fn delete(&self, request: &Request) -> Result<Response, TransportError> {
        self.send(reqwest::Method::DELETE, request)
    }
}
