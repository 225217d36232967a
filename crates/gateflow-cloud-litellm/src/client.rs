//! HTTP transport for the LiteLLM proxy control-plane API

use crate::error::{LiteLlmError, Result};
use async_trait::async_trait;
use gateflow_cloud::{ApiRequest, ApiResponse, CloudError, Method, Transport};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings
#[derive(Debug, Clone)]
pub struct LiteLlmConfig {
    /// e.g. `https://litellm.example.com`
    pub api_base: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl LiteLlmConfig {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(LiteLlmError::InvalidConfig(format!(
                "api_base must start with http:// or https:// (got {})",
                self.api_base
            )));
        }
        if self.api_key.is_empty() {
            return Err(LiteLlmError::InvalidConfig(
                "api_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// [`Transport`] over reqwest
pub struct HttpTransport {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: LiteLlmConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> gateflow_cloud::Result<ApiResponse> {
        let url = self.url(&request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        let mut builder = builder
            .header("x-api-key", &self.api_key)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        // reqwest errors embed the full URL, query string included
        let response = builder.send().await.map_err(|e| {
            CloudError::Transport(format!("{} {}: {}", request.method, url, e.without_url()))
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            CloudError::Transport(format!("reading response from {url}: {}", e.without_url()))
        })?;

        Ok(ApiResponse::new(status, body))
    }
}
