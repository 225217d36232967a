//! Planned actions against the gateway

use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};

/// A planned change to one declared resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    pub action_type: ActionType,

    pub kind: ResourceKind,

    /// Name of the resource in the declaration file
    pub name: String,

    /// Remote identity tracked in state, if any
    pub identity: Option<String>,

    pub description: String,

    /// Field-level differences, one line each
    #[serde(default)]
    pub changes: Vec<String>,
}

impl Action {
    pub fn new(action_type: ActionType, kind: ResourceKind, name: impl Into<String>) -> Self {
        let name = name.into();
        let description = match action_type {
            ActionType::Create => format!("{kind} '{name}' を作成"),
            ActionType::Update => format!("{kind} '{name}' を更新"),
            ActionType::Delete => format!("{kind} '{name}' を削除"),
            ActionType::NoOp => format!("{kind} '{name}' は変更なし"),
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description,
            action_type,
            kind,
            name,
            identity: None,
            changes: Vec::new(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_changes(mut self, changes: Vec<String>) -> Self {
        self.changes = changes;
        self
    }

    /// `kind.name`, the key used in the state file
    pub fn address(&self) -> String {
        format!("{}.{}", self.kind, self.name)
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub succeeded: Vec<ActionResult>,
    pub failed: Vec<ActionResult>,
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action: &Action, message: String) {
        self.succeeded.push(ActionResult {
            action_id: action.id.clone(),
            address: action.address(),
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action: &Action, error: String) {
        self.failed.push(ActionResult {
            action_id: action.id.clone(),
            address: action.address(),
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    pub address: String,
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

/// Outcome of re-reading tracked resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshResult {
    /// Addresses whose attributes were re-read
    pub refreshed: Vec<String>,
    /// Addresses dropped from state because the gateway no longer has them
    pub removed: Vec<String>,
}

/// Actions computed from declarations and state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Action for a given resource, if planned
    pub fn find(&self, kind: ResourceKind, name: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.kind == kind && a.name == name)
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Counts per action type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}
