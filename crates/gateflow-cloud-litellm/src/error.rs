//! LiteLLM provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiteLlmError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] gateflow_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, LiteLlmError>;
