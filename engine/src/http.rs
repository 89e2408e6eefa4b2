//! HTTP remote store built on `reqwest`.

use crate::{
    error::Result,
    remote::{Headers, Method, RemoteStore},
    Error, Record,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::env;
use std::time::Duration;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings of an [`HttpRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `TIDEWATER_REMOTE_URL` is required, `TIDEWATER_TIMEOUT_SECS` is
    /// optional.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let base_url =
            env::var("TIDEWATER_REMOTE_URL").map_err(|_| ConfigError::MissingRemoteUrl)?;

        let timeout = match env::var("TIDEWATER_TIMEOUT_SECS") {
            Ok(secs) => {
                let secs = secs.parse().map_err(|_| ConfigError::InvalidTimeout)?;
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_TIMEOUT,
        };

        Ok(Self { base_url, timeout })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TIDEWATER_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("Invalid TIDEWATER_TIMEOUT_SECS value")]
    InvalidTimeout,
}

/// A remote store reached over HTTP with JSON bodies.
///
/// Header names are case-insensitive: a per-request header replaces a
/// default one of the same name.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

fn insert_header(map: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::BadRequest(format!("header name {name:?}: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| Error::BadRequest(format!("header value for {name}: {e}")))?;
    map.insert(name, value);
    Ok(())
}

impl HttpRemote {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::BadRequest(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Add or replace a header sent with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        insert_header(&mut self.headers, name, value)?;
        Ok(self)
    }

    /// Default headers overlaid with the per-request ones.
    fn merged_headers(&self, extra: Option<&Headers>) -> Result<HeaderMap> {
        let mut merged = self.headers.clone();
        for (name, value) in extra.into_iter().flatten() {
            insert_header(&mut merged, name, value)?;
        }
        Ok(merged)
    }

    /// Full URL of `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Query string pairs for GET and DELETE parameters.
fn query_pairs(parameters: &Record) -> Vec<(String, String)> {
    parameters
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn request(
        &self,
        method: Method,
        path: &str,
        parameters: Option<&Record>,
        headers: Option<&Headers>,
    ) -> Result<Value> {
        let url = reqwest::Url::parse(&self.url(path))
            .map_err(|e| Error::BadRequest(format!("{}: {e}", self.url(path))))?;

        let mut request = self
            .client
            .request(to_reqwest(method), url)
            .headers(self.merged_headers(headers)?);

        if let Some(parameters) = parameters {
            request = match method {
                Method::Get | Method::Delete => request.query(&query_pairs(parameters)),
                _ => request.json(parameters),
            };
        }

        tracing::debug!(%method, path, "Sending request");
        let response = request
            .send()
            .await
            .map_err(|e| Error::BadResponse(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ServerError(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::BadResponse(e.to_string()))?;
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).map_err(|e| Error::ParsingFailed(e.to_string()))
    }
}
