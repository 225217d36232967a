//! Virtual API keys (`/key/*`)
//!
//! The gateway generates the key string on create and uses it as the key's
//! identity from then on.

use super::{
    Endpoints, IdentityPolicy, ManagedResource, ResourceKind, TeamRef, UpdateNotFound, from_body,
    note_cost, note_set, overlay, to_payload,
};
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared API key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySpec {
    pub key_alias: Option<String>,
    pub models: Option<Vec<String>>,
    pub max_budget: Option<f64>,
    pub soft_budget: Option<f64>,
    pub user_id: Option<String>,
    pub team: Option<TeamRef>,
    pub max_parallel_requests: Option<u64>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub tpm_limit: Option<u64>,
    pub rpm_limit: Option<u64>,
    pub budget_duration: Option<String>,
    /// Lifetime of a newly generated key, e.g. `30d`. Only sent on create.
    pub duration: Option<String>,
    pub guardrails: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub blocked: Option<bool>,
}

impl KeySpec {
    pub fn drift(&self, observed: &KeySpec) -> Vec<String> {
        let mut changes = Vec::new();
        note_set(&mut changes, "key_alias", &self.key_alias, &observed.key_alias);
        note_set(&mut changes, "models", &self.models, &observed.models);
        note_cost(&mut changes, "max_budget", self.max_budget, observed.max_budget);
        note_cost(&mut changes, "soft_budget", self.soft_budget, observed.soft_budget);
        note_set(&mut changes, "user_id", &self.user_id, &observed.user_id);
        note_set(&mut changes, "team", &self.team, &observed.team);
        note_set(
            &mut changes,
            "max_parallel_requests",
            &self.max_parallel_requests,
            &observed.max_parallel_requests,
        );
        note_set(&mut changes, "metadata", &self.metadata, &observed.metadata);
        note_set(&mut changes, "tpm_limit", &self.tpm_limit, &observed.tpm_limit);
        note_set(&mut changes, "rpm_limit", &self.rpm_limit, &observed.rpm_limit);
        note_set(
            &mut changes,
            "budget_duration",
            &self.budget_duration,
            &observed.budget_duration,
        );
        note_set(&mut changes, "guardrails", &self.guardrails, &observed.guardrails);
        note_set(&mut changes, "tags", &self.tags, &observed.tags);
        note_set(&mut changes, "blocked", &self.blocked, &observed.blocked);
        changes
    }
}

/// Mask a key for log output, keeping the last four characters
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[derive(Debug, Serialize)]
struct KeyRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_alias: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    models: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    soft_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    team_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_parallel_requests: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tpm_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rpm_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    budget_duration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guardrails: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocked: Option<bool>,
}

/// Key as reported by `/key/info`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeyRecord {
    pub key_alias: Option<String>,
    pub models: Option<Vec<String>>,
    pub spend: Option<f64>,
    pub max_budget: Option<f64>,
    pub soft_budget: Option<f64>,
    pub user_id: Option<String>,
    pub team_id: Option<String>,
    pub max_parallel_requests: Option<u64>,
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    pub tpm_limit: Option<u64>,
    pub rpm_limit: Option<u64>,
    pub budget_duration: Option<String>,
    pub guardrails: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub blocked: Option<bool>,
}

/// API keys
pub struct KeyResource;

impl ManagedResource for KeyResource {
    type Desired = KeySpec;
    type Remote = KeyRecord;
    type Tracked = KeySpec;

    const KIND: ResourceKind = ResourceKind::Key;
    const ENDPOINTS: Endpoints = Endpoints {
        create: "/key/generate",
        read: "/key/info",
        read_param: "key",
        update: "/key/update",
        delete: "/key/delete",
    };
    const IDENTITY: IdentityPolicy = IdentityPolicy::ServerAssigned;
    // A regenerated key would be a different secret; never recreate silently.
    const ON_UPDATE_NOT_FOUND: UpdateNotFound = UpdateNotFound::Propagate;

    fn validate(desired: &KeySpec) -> Result<()> {
        for (field, value) in [
            ("max_budget", desired.max_budget),
            ("soft_budget", desired.soft_budget),
        ] {
            if let Some(v) = value
                && v < 0.0
            {
                return Err(CloudError::InvalidConfig(format!(
                    "{field} must not be negative (got {v})"
                )));
            }
        }
        Ok(())
    }

    fn write_payload(desired: &KeySpec, identity: Option<&str>) -> Result<serde_json::Value> {
        let team_id = match &desired.team {
            Some(TeamRef::Id(id)) => Some(id.as_str()),
            Some(TeamRef::Declared(name)) => {
                return Err(CloudError::InvalidConfig(format!(
                    "unresolved team reference: {name}"
                )));
            }
            None => None,
        };

        to_payload(&KeyRequest {
            key: identity,
            key_alias: desired.key_alias.as_deref(),
            models: desired.models.as_deref(),
            max_budget: desired.max_budget,
            soft_budget: desired.soft_budget,
            user_id: desired.user_id.as_deref(),
            team_id,
            max_parallel_requests: desired.max_parallel_requests,
            metadata: desired.metadata.as_ref(),
            tpm_limit: desired.tpm_limit,
            rpm_limit: desired.rpm_limit,
            budget_duration: desired.budget_duration.as_deref(),
            // duration only applies when generating
            duration: if identity.is_none() {
                desired.duration.as_deref()
            } else {
                None
            },
            guardrails: desired.guardrails.as_deref(),
            tags: desired.tags.as_deref(),
            blocked: desired.blocked,
        })
    }

    fn identity_from_response(response: &serde_json::Value) -> Option<String> {
        response
            .get("key")
            .and_then(|k| k.as_str())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    fn delete_payload(identity: &str) -> serde_json::Value {
        serde_json::json!({ "keys": [identity] })
    }

    /// `/key/info` answers `{"key": "...", "info": {...}}`
    fn decode_remote(_identity: &str, body: serde_json::Value) -> Result<Option<KeyRecord>> {
        match body {
            serde_json::Value::Object(mut map) => match map.remove("info") {
                Some(serde_json::Value::Null) => Ok(None),
                Some(info) => Ok(Some(from_body(info)?)),
                None => Ok(Some(from_body(serde_json::Value::Object(map))?)),
            },
            other => Ok(Some(from_body(other)?)),
        }
    }

    fn track(desired: Option<&KeySpec>, remote: KeyRecord) -> KeySpec {
        let mut spec = desired.cloned().unwrap_or_default();
        overlay(&mut spec.key_alias, remote.key_alias);
        overlay(&mut spec.models, remote.models);
        overlay(&mut spec.max_budget, remote.max_budget);
        overlay(&mut spec.soft_budget, remote.soft_budget);
        overlay(&mut spec.user_id, remote.user_id);
        overlay(&mut spec.team, remote.team_id.map(TeamRef::Id));
        overlay(&mut spec.max_parallel_requests, remote.max_parallel_requests);
        overlay(
            &mut spec.metadata,
            remote.metadata.map(|m| {
                m.into_iter()
                    .map(|(k, v)| match v {
                        serde_json::Value::String(s) => (k, s),
                        other => (k, other.to_string()),
                    })
                    .collect()
            }),
        );
        overlay(&mut spec.tpm_limit, remote.tpm_limit);
        overlay(&mut spec.rpm_limit, remote.rpm_limit);
        overlay(&mut spec.budget_duration, remote.budget_duration);
        overlay(&mut spec.guardrails, remote.guardrails);
        overlay(&mut spec.tags, remote.tags);
        overlay(&mut spec.blocked, remote.blocked);
        spec
    }
}
