use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{instrument, trace, warn};

/// REST client trait for making HTTP requests
///
/// This trait provides a unified interface for HTTP operations across different
/// exchanges. Paths are relative to the client's base URL.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    ///
    /// # Returns
    /// The response body as a JSON value
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Value, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum number of retries for transport failures
    pub max_retries: u32,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout_seconds: 30,
            max_retries: 3,
            user_agent: "marketbridge/0.1".to_string(),
        }
    }

    /// Take timeout and retry settings from an exchange configuration
    pub fn from_exchange_config(
        base_url: String,
        exchange_name: String,
        config: &ExchangeConfig,
    ) -> Self {
        Self::new(base_url, exchange_name)
            .with_timeout(config.timeout_seconds)
            .with_max_retries(config.max_retries)
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
        })
    }
}

/// Implementation of `RestClient` using reqwest
///
/// Connect failures and timeouts are retried with exponential backoff up to
/// `max_retries`. Non-2xx responses are returned as `TransportError` without
/// retrying.
#[derive(Clone, Debug)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
}

impl ReqwestRest {
    pub fn new(base_url: String, exchange_name: String) -> Result<Self, ExchangeError> {
        RestClientBuilder::new(RestClientConfig::new(base_url, exchange_name)).build()
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Absolute URLs pass through; paths are appended to the base URL
    fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.config.base_url, endpoint)
        }
    }

    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ExchangeError::TransportError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            serde_json::from_str(&response_text).map_err(|e| {
                ExchangeError::DecodeError(format!("Failed to parse JSON response: {}", e))
            })
        } else {
            Err(ExchangeError::TransportError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                response_text
            )))
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, ExchangeError> {
        let mut request = self.client.request(method, url);
        if !query_params.is_empty() {
            request = request.query(query_params);
        }
        request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                warn!(url = %url, "Request failed, may retry: {}", e);
            }
            ExchangeError::TransportError(format!("Request failed: {}", e))
        })
    }

    #[instrument(skip(self, query_params), fields(exchange = %self.config.exchange_name, method = %method, endpoint = %endpoint))]
    async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Value, ExchangeError> {
        let url = self.build_url(endpoint);
        let url = url.as_str();
        // 100ms, 200ms, 400ms, ...
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(50)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.config.max_retries as usize);

        let response = RetryIf::spawn(
            strategy,
            || self.send_once(method.clone(), url, query_params),
            ExchangeError::is_retryable,
        )
        .await?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, query_params), fields(exchange = %self.config.exchange_name, endpoint = %endpoint, param_count = query_params.len()))]
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Value, ExchangeError> {
        self.make_request(Method::GET, endpoint, query_params).await
    }
}
