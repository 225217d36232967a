//! LiteLLM proxy provider for GateFlow
//!
//! This crate implements the GatewayProvider trait for the LiteLLM proxy,
//! enabling GateFlow to manage models, teams, team membership and virtual
//! keys through the proxy's admin API.
//!
//! # Requirements
//!
//! - the proxy URL, e.g. `https://litellm.example.com`
//! - the master key or an admin key
//!
//! # Example
//!
//! ```ignore
//! use gateflow_cloud::{GatewayProvider, GlobalState, ResourceSet};
//! use gateflow_cloud_litellm::{LiteLlmConfig, LiteLlmProvider};
//!
//! let provider = LiteLlmProvider::from_config(LiteLlmConfig::new(api_base, api_key))?;
//!
//! let mut state = GlobalState::new();
//! let plan = provider.plan(&desired, &state).await?;
//! let result = provider.apply(&plan, &desired, &mut state).await?;
//! ```

pub mod client;
pub mod error;
pub mod provider;

pub use client::{HttpTransport, LiteLlmConfig};
pub use error::{LiteLlmError, Result};
pub use provider::LiteLlmProvider;
