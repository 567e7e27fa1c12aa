//! HTTP transport with retry on transient failures
//!
//! [`Transport`] is the seam the pagination driver and the enrichment joiner
//! talk to. [`HttpTransport`] is the production implementation: one
//! `reqwest::Client` per run carrying the API key header, with every GET
//! wrapped in [`with_retry`](crate::retry::with_retry).

use crate::config::{ApiConfig, RetryConfig};
use crate::error::{Error, Result, TransportError};
use crate::retry::with_retry;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Query parameters for a GET request
pub type Query<'a> = [(&'a str, String)];

/// A successful HTTP response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

/// Read-only HTTP access used by the fetch pipeline
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET request, returning only successful responses
    ///
    /// Implementations retry transient failures internally; the error returned
    /// is the one that survived the retry policy.
    async fn get(
        &self,
        url: &Url,
        query: &Query<'_>,
    ) -> std::result::Result<HttpResponse, TransportError>;

    /// Issue a GET request and decode the body as JSON
    async fn get_json(
        &self,
        url: &Url,
        query: &Query<'_>,
    ) -> std::result::Result<Value, TransportError> {
        let response = self.get(url, query).await?;
        serde_json::from_str(&response.body).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Production transport backed by `reqwest`
pub struct HttpTransport {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpTransport {
    /// Build a transport for one run
    ///
    /// # Errors
    /// Returns a configuration error if the API key or its header name are not
    /// valid HTTP header text, or if the client cannot be created.
    pub fn new(api: &ApiConfig, retry: RetryConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        // A missing key is not validated here; the API answers 401/403
        if let Some(key) = &api.api_key {
            let name = HeaderName::from_bytes(api.api_key_header.as_bytes()).map_err(|e| {
                Error::config("api.api_key_header", format!("invalid header name: {e}"))
            })?;
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| Error::config("api.api_key", format!("invalid header value: {e}")))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("ridb-dl/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = api.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::config("api", format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, retry })
    }

    async fn send_once(
        &self,
        url: &Url,
        query: &Query<'_>,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let response = self.client.get(url.clone()).query(query).send().await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(TransportError::Status {
                status,
                url: url.to_string(),
                transient: self.retry.is_transient_status(status),
                retry_after: parse_retry_after(response.headers()),
            });
        }

        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &Url,
        query: &Query<'_>,
    ) -> std::result::Result<HttpResponse, TransportError> {
        tracing::debug!(%url, ?query, "GET");
        with_retry(&self.retry, move || self.send_once(url, query)).await
    }
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
