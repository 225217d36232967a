//! Resource kinds managed on the gateway
//!
//! Every kind that follows the create/read/update/delete shape implements
//! [`ManagedResource`]. The generic [`Reconciler`](crate::Reconciler) reads
//! the kind's endpoints, identity policy and not-found policy from here and
//! contains no per-kind branching of its own.

mod key;
mod member;
mod model;
mod team;

pub use key::{KeyRecord, KeyResource, KeySpec, mask_key};
pub use member::{
    IdentityKey, MemberRole, MemberSetSpec, MembershipEntry, MembershipSet, RemoteMember,
};
pub use model::{
    DEFAULT_THINKING_BUDGET_TOKENS, DEFAULT_TIER, LiteLlmParams, ModelInfo, ModelMode, ModelRecord,
    ModelResource, ModelSpec, ReasoningEffort, Thinking, derive_model_name,
};
pub use team::{TeamRecord, TeamRef, TeamResource, TeamSpec};
pub(crate) use team::team_info;

use crate::error::{CloudError, Result};
use crate::transport::ApiRequest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Kind of a gateway resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Model,
    Team,
    Key,
    TeamMembers,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Model => "model",
            ResourceKind::Team => "team",
            ResourceKind::Key => "key",
            ResourceKind::TeamMembers => "team-members",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model" => Ok(ResourceKind::Model),
            "team" => Ok(ResourceKind::Team),
            "key" => Ok(ResourceKind::Key),
            "team-members" | "team_members" => Ok(ResourceKind::TeamMembers),
            other => Err(CloudError::InvalidConfig(format!(
                "unknown resource kind: {other}"
            ))),
        }
    }
}

/// Where a resource's identity comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// A UUID v4 is generated before create and sent with the payload
    LocalUuid,
    /// The create response carries the identity
    ServerAssigned,
}

/// What an update does when the server no longer knows the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateNotFound {
    /// Run the create path once, with a fresh identity
    RecreateOnce,
    /// Surface the not-found error to the caller
    Propagate,
}

/// Endpoint family of a resource kind
#[derive(Debug, Clone, Copy)]
pub struct Endpoints {
    pub create: &'static str,
    pub read: &'static str,
    /// Query parameter carrying the identity on read
    pub read_param: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
}

impl Endpoints {
    /// GET addressing one resource by identity
    pub fn read_request(&self, identity: &str) -> ApiRequest {
        ApiRequest::get(self.read).with_query(self.read_param, identity)
    }
}

/// Per-kind behavior injected into the generic reconciler
pub trait ManagedResource: Send + Sync + 'static {
    /// Declared attributes
    type Desired: Send + Sync;
    /// Representation returned by the read endpoint
    type Remote: DeserializeOwned + Send;
    /// Attributes kept after a successful read
    type Tracked: Send;

    const KIND: ResourceKind;
    const ENDPOINTS: Endpoints;
    const IDENTITY: IdentityPolicy;
    const ON_UPDATE_NOT_FOUND: UpdateNotFound;

    /// Reject declarations that would produce a malformed request
    fn validate(_desired: &Self::Desired) -> Result<()> {
        Ok(())
    }

    /// Body for create and update.
    ///
    /// `identity` is `None` only when creating a server-assigned resource.
    fn write_payload(desired: &Self::Desired, identity: Option<&str>) -> Result<serde_json::Value>;

    /// Identity carried by a create response (server-assigned kinds only)
    fn identity_from_response(_response: &serde_json::Value) -> Option<String> {
        None
    }

    fn delete_payload(identity: &str) -> serde_json::Value;

    /// Extract the resource addressed by `identity` from a read response.
    /// `Ok(None)` means absent.
    fn decode_remote(identity: &str, body: serde_json::Value) -> Result<Option<Self::Remote>>;

    /// Build tracked attributes from the authoritative remote copy, keeping
    /// values the API does not echo from the declaration.
    fn track(desired: Option<&Self::Desired>, remote: Self::Remote) -> Self::Tracked;
}

/// Serialize a request record into a JSON value
pub(crate) fn to_payload<T: Serialize>(record: &T) -> Result<serde_json::Value> {
    serde_json::to_value(record)
        .map_err(|e| CloudError::serialization(e, std::any::type_name::<T>()))
}

/// Decode a response value into a typed record
pub(crate) fn from_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    let payload = body.to_string();
    serde_json::from_value(body).map_err(|e| CloudError::serialization(e, payload))
}

// ============ Drift helpers ============

/// Replace `slot` when the server reported a value
pub(crate) fn overlay<T>(slot: &mut Option<T>, remote: Option<T>) {
    if remote.is_some() {
        *slot = remote;
    }
}

/// Record a change for a required field
pub(crate) fn note_change<T: PartialEq + std::fmt::Debug>(
    changes: &mut Vec<String>,
    field: &str,
    desired: &T,
    observed: &T,
) {
    if desired != observed {
        changes.push(format!("{field}: {observed:?} -> {desired:?}"));
    }
}

/// Record a change for an optional field. Unset declarations never drift.
pub(crate) fn note_set<T: PartialEq + std::fmt::Debug>(
    changes: &mut Vec<String>,
    field: &str,
    desired: &Option<T>,
    observed: &Option<T>,
) {
    if let Some(value) = desired
        && observed.as_ref() != Some(value)
    {
        changes.push(format!("{field}: {observed:?} -> {value:?}"));
    }
}

/// Like [`note_set`] with a relative tolerance for unit-converted prices
pub(crate) fn note_cost(
    changes: &mut Vec<String>,
    field: &str,
    desired: Option<f64>,
    observed: Option<f64>,
) {
    let Some(want) = desired else {
        return;
    };
    let same = observed.is_some_and(|got| (got - want).abs() <= want.abs().max(1.0) * 1e-9);
    if !same {
        changes.push(format!("{field}: {observed:?} -> {want}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_set_ignores_unset() {
        let mut changes = Vec::new();
        note_set::<u64>(&mut changes, "tpm", &None, &Some(10));
        assert!(changes.is_empty());
        note_set(&mut changes, "tpm", &Some(5u64), &Some(10));
        assert_eq!(changes, vec!["tpm: Some(10) -> 5".to_string()]);
    }

    #[test]
    fn test_note_cost_tolerance() {
        let mut changes = Vec::new();
        note_cost(&mut changes, "c", Some(30.0), Some(30.0 + 1e-12));
        assert!(changes.is_empty());
        note_cost(&mut changes, "c", Some(30.0), None);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_read_request() {
        let req = TeamResource::ENDPOINTS.read_request("t-1");
        assert_eq!(req.path, "/team/info");
        assert_eq!(req.query, vec![("team_id".to_string(), "t-1".to_string())]);

        let req = KeyResource::ENDPOINTS.read_request("sk-abc/def");
        assert_eq!(req.path, "/key/info");
        assert_eq!(req.query, vec![("key".to_string(), "sk-abc/def".to_string())]);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ResourceKind::Model,
            ResourceKind::Team,
            ResourceKind::Key,
            ResourceKind::TeamMembers,
        ] {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert!("org".parse::<ResourceKind>().is_err());
    }
}
