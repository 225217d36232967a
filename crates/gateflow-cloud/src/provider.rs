//! Gateway provider trait definition

use crate::action::{ApplyResult, Plan, RefreshResult};
use crate::error::Result;
use crate::resource::{KeySpec, MemberSetSpec, ModelSpec, ResourceKind, TeamSpec};
use crate::state::GlobalState;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Gateway backend abstraction
///
/// A provider turns declarations plus the local state into a [`Plan`],
/// applies it, and keeps the state in step with what the gateway reports.
#[async_trait]
pub trait GatewayProvider: Send + Sync {
    /// Returns the provider name (e.g. "litellm")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Compare declarations with state and the remote copies
    async fn plan(&self, desired: &ResourceSet, state: &GlobalState) -> Result<Plan>;

    /// Apply a plan, recording every identity change in `state`
    async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut GlobalState,
    ) -> Result<ApplyResult>;

    /// Re-read every tracked resource and drop the ones the gateway lost
    async fn refresh(&self, state: &mut GlobalState) -> Result<RefreshResult>;

    /// Delete every tracked resource
    async fn destroy_all(&self, state: &mut GlobalState) -> Result<ApplyResult>;
}

/// Declared resources, keyed by their name in the declaration file
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    pub models: BTreeMap<String, ModelSpec>,
    pub teams: BTreeMap<String, TeamSpec>,
    pub member_sets: BTreeMap<String, MemberSetSpec>,
    pub keys: BTreeMap<String, KeySpec>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.models.len() + self.teams.len() + self.member_sets.len() + self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a resource of `kind` named `name` is declared
    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        match kind {
            ResourceKind::Model => self.models.contains_key(name),
            ResourceKind::Team => self.teams.contains_key(name),
            ResourceKind::TeamMembers => self.member_sets.contains_key(name),
            ResourceKind::Key => self.keys.contains_key(name),
        }
    }

    /// Declared names of one kind, in order
    pub fn names(&self, kind: ResourceKind) -> Vec<&str> {
        match kind {
            ResourceKind::Model => self.models.keys().map(String::as_str).collect(),
            ResourceKind::Team => self.teams.keys().map(String::as_str).collect(),
            ResourceKind::TeamMembers => self.member_sets.keys().map(String::as_str).collect(),
            ResourceKind::Key => self.keys.keys().map(String::as_str).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_set_lookup() {
        let mut set = ResourceSet::new();
        assert!(set.is_empty());

        set.models
            .insert("gpt-4".to_string(), ModelSpec::new("gpt-4", "openai", "gpt-4"));
        set.teams
            .insert("research".to_string(), TeamSpec::new("research"));

        assert_eq!(set.len(), 2);
        assert!(set.contains(ResourceKind::Model, "gpt-4"));
        assert!(!set.contains(ResourceKind::Key, "gpt-4"));
        assert_eq!(set.names(ResourceKind::Team), vec!["research"]);
    }
}
