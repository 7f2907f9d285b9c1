//! Wire transport for API calls
//!
//! `Transport` is the seam between the session logic and the network. The
//! session manager and the request client only ever see a status code and a
//! body; `HttpTransport` is the reqwest-backed implementation used by the
//! shell, tests script their own.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument};

use crate::error::TransportError;

/// One request as it goes on the wire.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    /// Path relative to the API base, query string included.
    pub path: String,
    pub headers: HeaderMap,
    /// Serialized JSON payload.
    pub body: Option<String>,
}

impl WireRequest {
    /// Request with the JSON headers every API call carries.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            method,
            path: path.into(),
            headers,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    /// Set (or replace) the access token header.
    pub fn set_token(&mut self, token: &str) -> Result<(), TransportError> {
        let value = HeaderValue::from_str(token)
            .map_err(|e| TransportError::Http(format!("invalid token header value: {e}")))?;
        self.headers.insert(
            HeaderName::from_static(finance_auth::AUTH_TOKEN_HEADER),
            value,
        );
        Ok(())
    }
}

/// Status and raw body of an API response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a request and returns its response.
///
/// Uses `Pin<Box<dyn Future>>` so the client can hold `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a WireRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>>;
}

/// reqwest-backed transport against a fixed API base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client,
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a WireRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        Box::pin(self.send_inner(request))
    }
}

impl HttpTransport {
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    async fn send_inner(&self, request: &WireRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url_for(&request.path))
            .headers(request.headers.clone())
            .timeout(self.timeout);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        debug!(status, bytes = body.len(), "api response");

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}
