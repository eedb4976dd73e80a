//! Authenticated HTTP transport
//!
//! Every request carries the App Center API token and a JSON content type.
//! Transient failures (network errors, 5xx, 401) are retried with a capped
//! exponential backoff before the response is handed to the caller, which
//! checks the status code against the one it expects.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::{AppCenterError, Result};

const API_TOKEN_HEADER: &str = "x-api-token";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Retry behavior for transient failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry
    pub wait_min: Duration,
    /// Upper bound for any wait
    pub wait_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            wait_min: Duration::from_secs(5),
            wait_max: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            wait_min: Duration::ZERO,
            wait_max: Duration::ZERO,
        }
    }

    /// Wait before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.wait_min.saturating_mul(factor).min(self.wait_max)
    }

    /// 401 is retried because a freshly created upload slot's token may not
    /// have propagated yet.
    pub fn should_retry_status(status: StatusCode) -> bool {
        status == StatusCode::UNAUTHORIZED
            || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
    }

    fn should_retry_error(err: &reqwest::Error) -> bool {
        err.is_connect() || err.is_timeout() || err.is_request()
    }
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Static API token
    pub api_token: String,
    /// Log full request and response bodies at info level
    pub debug: bool,
    /// Retry policy
    pub retry: RetryPolicy,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// A request to send through [`Transport`]
#[derive(Debug, Clone)]
pub struct ApiRequest {
    operation: &'static str,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    body_text: Option<String>,
}

impl ApiRequest {
    /// `operation` names the request in logs and errors
    pub fn new(operation: &'static str, method: Method, url: Url) -> Self {
        Self {
            operation,
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            body_text: None,
        }
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let text = serde_json::to_string(body)?;
        self.body = Some(Bytes::from(text.clone()));
        self.body_text = Some(text);
        Ok(self)
    }

    /// Attach a raw byte body
    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body_text = Some(format!("<{} bytes>", body.len()));
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.headers.insert(HeaderName::from_static(name), value);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// A response whose status has not been checked yet
#[derive(Debug, Clone)]
pub struct ApiResponse {
    operation: &'static str,
    url: String,
    request_body: Option<String>,
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Fail with [`AppCenterError::UnexpectedStatus`] unless the status is `expected`
    pub fn expect_status(self, expected: StatusCode) -> Result<Self> {
        if self.status == expected {
            return Ok(self);
        }

        Err(AppCenterError::UnexpectedStatus {
            operation: self.operation,
            status: self.status.as_u16(),
            url: self.url,
            request_body: self.request_body,
            response_body: self.body,
        })
    }

    /// Decode the body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| AppCenterError::Decode {
            operation: self.operation,
            url: self.url.clone(),
            message: e.to_string(),
            body: self.body.clone(),
        })
    }
}

/// HTTP transport shared by every App Center call
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    retry: RetryPolicy,
    debug: bool,
}

impl Transport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut token = HeaderValue::from_str(&config.api_token)?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_TOKEN_HEADER), token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            retry: config.retry,
            debug: config.debug,
        })
    }

    /// Send a request, retrying transient failures
    ///
    /// Returns the final response whatever its status; only failures to get
    /// a response at all are errors here.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut attempt = 0;

        loop {
            self.dump_request(&request);

            match self.send_once(&request).await {
                Ok((status, body)) => {
                    if RetryPolicy::should_retry_status(status) && attempt < self.retry.max_retries
                    {
                        let delay = self.retry.backoff(attempt);
                        attempt += 1;
                        warn!(
                            operation = request.operation,
                            status = status.as_u16(),
                            attempt,
                            "Retrying in {}ms",
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    self.dump_response(&request, status, &body);

                    return Ok(ApiResponse {
                        operation: request.operation,
                        url: request.url.to_string(),
                        request_body: request.body_text,
                        status,
                        body,
                    });
                }
                Err(e) => {
                    if RetryPolicy::should_retry_error(&e) && attempt < self.retry.max_retries {
                        let delay = self.retry.backoff(attempt);
                        attempt += 1;
                        warn!(
                            operation = request.operation,
                            error = %e,
                            attempt,
                            "Request error, retrying in {}ms",
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(AppCenterError::Transport(e));
                }
            }
        }
    }

    async fn send_once(&self, request: &ApiRequest) -> reqwest::Result<(StatusCode, String)> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    fn dump_request(&self, request: &ApiRequest) {
        let body = request.body_text.as_deref().unwrap_or("");
        if self.debug {
            info!("Request: {} {} {}", request.method, request.url, body);
        } else {
            debug!(operation = request.operation, "{} {}", request.method, request.url);
            trace!("Request body: {}", body);
        }
    }

    fn dump_response(&self, request: &ApiRequest, status: StatusCode, body: &str) {
        if self.debug {
            info!("Response: {} {} -> {} {}", request.method, request.url, status, body);
        } else {
            debug!(operation = request.operation, status = status.as_u16(), "Response received");
            trace!("Response body: {}", body);
        }
    }
}
