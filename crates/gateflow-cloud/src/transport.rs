//! Transport abstraction for the gateway control-plane API
//!
//! The engine never talks HTTP directly. Every remote call goes through a
//! [`Transport`], which only has to move a JSON request to the server and
//! hand back the status code and raw body. Classification of that body
//! happens in [`crate::classify`].

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// HTTP method used by the control-plane API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A request against the control-plane API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,

    /// Path without query string, e.g. `/team/info`. Safe to log.
    pub path: String,

    /// Query parameters, unencoded. Values may carry secrets and are never
    /// logged; transports encode them when building the URL.
    pub query: Vec<(String, String)>,

    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Raw response returned by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Moves requests to the control plane.
///
/// Implementations report connection-level failures as
/// [`CloudError::Transport`](crate::CloudError::Transport) and return every
/// HTTP response, successful or not, as an [`ApiResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}
