//! Teams (`/team/*`)

use super::{
    Endpoints, IdentityPolicy, ManagedResource, ResourceKind, UpdateNotFound, from_body,
    note_change, note_cost, note_set, overlay, to_payload,
};
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared team
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSpec {
    pub team_alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
}

impl TeamSpec {
    pub fn new(team_alias: impl Into<String>) -> Self {
        Self {
            team_alias: team_alias.into(),
            ..Default::default()
        }
    }

    pub fn drift(&self, observed: &TeamSpec) -> Vec<String> {
        let mut changes = Vec::new();
        note_change(&mut changes, "team_alias", &self.team_alias, &observed.team_alias);
        note_set(
            &mut changes,
            "organization_id",
            &self.organization_id,
            &observed.organization_id,
        );
        note_set(&mut changes, "metadata", &self.metadata, &observed.metadata);
        note_set(&mut changes, "tpm_limit", &self.tpm_limit, &observed.tpm_limit);
        note_set(&mut changes, "rpm_limit", &self.rpm_limit, &observed.rpm_limit);
        note_cost(&mut changes, "max_budget", self.max_budget, observed.max_budget);
        note_set(
            &mut changes,
            "budget_duration",
            &self.budget_duration,
            &observed.budget_duration,
        );
        note_set(&mut changes, "models", &self.models, &observed.models);
        note_set(&mut changes, "blocked", &self.blocked, &observed.blocked);
        changes
    }
}

/// How a declaration points at a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRef {
    /// Remote team id, used as is
    Id(String),
    /// Name of a `team` declared in the same file, resolved through state
    Declared(String),
}

impl std::fmt::Display for TeamRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamRef::Id(id) => write!(f, "team-id {id}"),
            TeamRef::Declared(name) => write!(f, "team {name}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct TeamRequest<'a> {
    team_id: &'a str,
    #[serde(flatten)]
    spec: &'a TeamSpec,
}

/// Team as reported by `/team/info`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TeamRecord {
    pub team_id: Option<String>,
    pub team_alias: Option<String>,
    pub organization_id: Option<String>,
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    pub tpm_limit: Option<u64>,
    pub rpm_limit: Option<u64>,
    pub max_budget: Option<f64>,
    pub budget_duration: Option<String>,
    pub models: Option<Vec<String>>,
    pub blocked: Option<bool>,
    pub spend: Option<f64>,
    pub members_with_roles: Vec<serde_json::Value>,
}

/// Unwrap `{"team_info": {...}}` if present
pub(crate) fn team_info(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) => match map.remove("team_info") {
            Some(inner @ serde_json::Value::Object(_)) => inner,
            Some(other) => {
                map.insert("team_info".to_string(), other);
                serde_json::Value::Object(map)
            }
            None => serde_json::Value::Object(map),
        },
        other => other,
    }
}

/// Teams
pub struct TeamResource;

impl ManagedResource for TeamResource {
    type Desired = TeamSpec;
    type Remote = TeamRecord;
    type Tracked = TeamSpec;

    const KIND: ResourceKind = ResourceKind::Team;
    const ENDPOINTS: Endpoints = Endpoints {
        create: "/team/new",
        read: "/team/info",
        read_param: "team_id",
        update: "/team/update",
        delete: "/team/delete",
    };
    const IDENTITY: IdentityPolicy = IdentityPolicy::LocalUuid;
    const ON_UPDATE_NOT_FOUND: UpdateNotFound = UpdateNotFound::RecreateOnce;

    fn validate(desired: &TeamSpec) -> Result<()> {
        if desired.team_alias.trim().is_empty() {
            return Err(CloudError::InvalidConfig(
                "team_alias must not be empty".to_string(),
            ));
        }
        if let Some(budget) = desired.max_budget
            && budget < 0.0
        {
            return Err(CloudError::InvalidConfig(format!(
                "max_budget must not be negative (got {budget})"
            )));
        }
        Ok(())
    }

    fn write_payload(desired: &TeamSpec, identity: Option<&str>) -> Result<serde_json::Value> {
        let team_id = identity.ok_or_else(|| {
            CloudError::InvalidConfig("team identity must be assigned before write".to_string())
        })?;
        to_payload(&TeamRequest {
            team_id,
            spec: desired,
        })
    }

    fn delete_payload(identity: &str) -> serde_json::Value {
        serde_json::json!({ "team_ids": [identity] })
    }

    fn decode_remote(_identity: &str, body: serde_json::Value) -> Result<Option<TeamRecord>> {
        Ok(Some(from_body(team_info(body))?))
    }

    fn track(desired: Option<&TeamSpec>, remote: TeamRecord) -> TeamSpec {
        let mut spec = desired.cloned().unwrap_or_default();
        if let Some(alias) = remote.team_alias {
            spec.team_alias = alias;
        }
        overlay(&mut spec.organization_id, remote.organization_id);
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
        overlay(&mut spec.max_budget, remote.max_budget);
        overlay(&mut spec.budget_duration, remote.budget_duration);
        overlay(&mut spec.models, remote.models);
        overlay(&mut spec.blocked, remote.blocked);
        spec
    }
}
