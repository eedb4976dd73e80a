//! Client configuration and entry point

use std::time::Duration;

use crate::app::AppClient;
use crate::endpoints::{Endpoints, DEFAULT_API_URL};
use crate::error::{AppCenterError, Result};
use crate::publish::PollPolicy;
use crate::transport::{RetryPolicy, Transport, TransportConfig};
use crate::types::App;

/// App Center client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL
    pub base_url: String,

    /// API token sent as `X-API-Token`
    pub api_token: String,

    /// Log full request and response bodies
    pub debug: bool,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,

    /// Readiness polling bounds
    pub poll: PollPolicy,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            api_token: api_token.into(),
            debug: false,
            retry: RetryPolicy::default(),
            poll: PollPolicy::default(),
            request_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Authenticated App Center client
///
/// ```ignore
/// use appcenter::{App, AppCenterClient, ClientConfig};
///
/// let client = AppCenterClient::new(ClientConfig::new(token))?;
/// let group = client.app(App::new("acme", "field-service")).get_group("QA").await?;
/// ```
#[derive(Debug, Clone)]
pub struct AppCenterClient {
    transport: Transport,
    endpoints: Endpoints,
    poll: PollPolicy,
}

impl AppCenterClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(AppCenterError::Configuration(
                "API token is required".to_string(),
            ));
        }

        let transport = Transport::new(&TransportConfig {
            api_token: config.api_token,
            debug: config.debug,
            retry: config.retry,
            request_timeout: config.request_timeout,
        })?;

        Ok(Self {
            transport,
            endpoints: Endpoints::new(&config.base_url)?,
            poll: config.poll,
        })
    }

    /// Operations scoped to one app
    pub fn app(&self, app: App) -> AppClient {
        AppClient::new(
            self.transport.clone(),
            self.endpoints.clone(),
            self.poll,
            app,
        )
    }
}
