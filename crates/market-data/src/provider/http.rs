//! Transport seam between providers and the network.
//!
//! Providers describe a request with [`HttpRequest`] and receive the raw body
//! bytes. Decoding (UTF-8, GB18030, JSON, markup) is the provider's job, so the
//! transport stays ignorant of every payload format.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::errors::MarketDataError;

use super::headers::default_headers;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// Provider issuing the request, used to label errors
    pub provider: &'static str,
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(&'static str, String)>,
}

impl HttpRequest {
    pub fn get(provider: &'static str, url: impl Into<String>) -> Self {
        Self {
            provider,
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn post(provider: &'static str, url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(provider, url)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Performs HTTP requests on behalf of providers.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Send the request and return the response body.
    ///
    /// Non-2xx statuses are reported as [`MarketDataError::HttpStatus`].
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, MarketDataError>;

    /// Send the request and decode the body as (lossy) UTF-8.
    async fn execute_text(&self, request: HttpRequest) -> Result<String, MarketDataError> {
        let body = self.execute(request).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// [`HttpFetch`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Build the shared client. Fails when the TLS backend cannot be set up.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .default_headers(default_headers(user_agent))
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, MarketDataError> {
        let provider = request.provider;

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        let response = builder.send().await.map_err(|e| classify(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::HttpStatus {
                provider: provider.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| classify(provider, e))?;
        Ok(body.to_vec())
    }
}

fn classify(provider: &str, error: reqwest::Error) -> MarketDataError {
    if error.is_timeout() {
        MarketDataError::Timeout {
            provider: provider.to_string(),
        }
    } else {
        MarketDataError::Network(error)
    }
}
