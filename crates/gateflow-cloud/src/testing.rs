//! Scripted transport for tests

use crate::error::{CloudError, Result};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Transport that replays queued responses and records every request.
///
/// Running out of responses is reported as a transport error, so a test
/// fails loudly when the code under test issues an unexpected call.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn respond(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(Ok(ApiResponse::new(status, body.to_string())))
    }

    /// Queue a raw-body response
    pub fn respond_raw(&self, status: u16, body: &str) -> &Self {
        self.push(Ok(ApiResponse::new(status, body)))
    }

    /// Queue `{"error": {"message": ...}}` with the given status
    pub fn respond_error(&self, status: u16, message: &str) -> &Self {
        self.respond(
            status,
            serde_json::json!({ "error": { "message": message } }),
        )
    }

    /// Queue a connection-level failure
    pub fn fail(&self, message: &str) -> &Self {
        self.push(Err(CloudError::Transport(message.to_string())))
    }

    fn push(&self, response: Result<ApiResponse>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
        self
    }

    /// Every request sent so far
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Paths of every request sent so far
    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    /// Responses that were queued but never consumed
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(CloudError::Transport(format!(
                    "no scripted response for {} {}",
                    request.method, request.path
                )))
            })
    }
}
