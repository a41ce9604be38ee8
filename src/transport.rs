use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use crate::config::ClientConfig;

/// Status and body of one HTTP response.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Issues authenticated GET requests.
///
/// An `Err` means no response was received at all; any HTTP status,
/// including errors, comes back as an [`HttpReply`].
pub trait Transport {
    fn get(&self, url: &str, token: &str) -> Result<HttpReply>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, token: &str) -> Result<HttpReply> {
        (**self).get(url, token)
    }
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("unpop/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("unpop")),
        );
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(cfg.timeout);

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, token: &str) -> Result<HttpReply> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(token.trim())
            .send()
            .context("request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("failed to read response body (status={})", status))?;
        Ok(HttpReply { status, body })
    }
}
