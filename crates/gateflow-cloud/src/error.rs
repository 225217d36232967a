//! Reconciliation error types

use crate::resource::ResourceKind;
use thiserror::Error;

/// Errors surfaced by the reconciliation engine
#[derive(Error, Debug)]
pub enum CloudError {
    /// Connection, DNS or TLS failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound payload could not be encoded or a response body could not be decoded
    #[error("Serialization error: {message}\nPayload: {payload}")]
    Serialization { message: String, payload: String },

    /// The remote system reports that the addressed resource does not exist
    #[error("{kind} not found: {path}")]
    NotFound { kind: ResourceKind, path: String },

    /// Any other non-200 response
    #[error("API request failed: status {status}, response: {body}, request: {request}")]
    Api {
        status: u16,
        body: String,
        request: String,
    },

    /// The write succeeded but the follow-up read failed.
    /// The identity is already assigned remotely and must be retained.
    /// It stays out of the message because key identities are secrets.
    #[error("{kind} was applied but could not be read back: {source}")]
    PartialApply {
        kind: ResourceKind,
        identity: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound { .. })
    }

    /// Identity assigned by a write whose read-back failed, if any
    pub fn assigned_identity(&self) -> Option<&str> {
        match self {
            CloudError::PartialApply { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub(crate) fn serialization(err: serde_json::Error, payload: impl Into<String>) -> Self {
        CloudError::Serialization {
            message: err.to_string(),
            payload: payload.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_identity_only_for_partial_apply() {
        let partial = CloudError::PartialApply {
            kind: ResourceKind::Model,
            identity: "abc".to_string(),
            source: Box::new(CloudError::Transport("reset".to_string())),
        };
        assert_eq!(partial.assigned_identity(), Some("abc"));
        assert!(!partial.to_string().contains("abc"));

        let other = CloudError::Transport("reset".to_string());
        assert_eq!(other.assigned_identity(), None);
    }

    #[test]
    fn test_api_error_message_carries_request() {
        let err = CloudError::Api {
            status: 500,
            body: "boom".to_string(),
            request: r#"{"id":"1"}"#.to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("boom"));
        assert!(message.contains(r#"{"id":"1"}"#));
    }
}
