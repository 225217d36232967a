//! LiteLLM provider implementation
//!
//! Creates and updates run models first, then teams, member sets and keys,
//! so that team references resolve through state. Deletes run in reverse.

use crate::client::{HttpTransport, LiteLlmConfig};
use crate::error::Result as LiteLlmResult;
use async_trait::async_trait;
use gateflow_cloud::diff::diff;
use gateflow_cloud::resource::ManagedResource;
use gateflow_cloud::state::GlobalState;
use gateflow_cloud::{
    Action, ActionType, ApiClient, ApplyResult, CloudError, GatewayProvider, KeyReconciler,
    KeySpec, MemberSetReconciler, MemberSetSpec, MembershipSet, ModelReconciler, Plan,
    Reconciler, RefreshResult, ResourceKind, ResourceSet, ResourceState, Result, TeamReconciler,
    TeamRef, WriteOutcome,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Creation order; deletes use the reverse
const APPLY_ORDER: [ResourceKind; 4] = [
    ResourceKind::Model,
    ResourceKind::Team,
    ResourceKind::TeamMembers,
    ResourceKind::Key,
];

/// LiteLLM proxy provider
pub struct LiteLlmProvider {
    models: ModelReconciler,
    teams: TeamReconciler,
    keys: KeyReconciler,
    members: MemberSetReconciler,
}

impl LiteLlmProvider {
    pub fn new(client: ApiClient) -> Self {
        Self {
            models: Reconciler::new(client.clone()),
            teams: Reconciler::new(client.clone()),
            keys: Reconciler::new(client.clone()),
            members: MemberSetReconciler::new(client),
        }
    }

    /// Provider talking HTTP to the proxy at `config.api_base`
    pub fn from_config(config: LiteLlmConfig) -> LiteLlmResult<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(ApiClient::new(Arc::new(transport))))
    }

    async fn plan_resource<R>(
        reconciler: &Reconciler<R>,
        name: &str,
        desired: &R::Desired,
        state: &GlobalState,
        drift: impl Fn(&R::Desired, &R::Tracked) -> Vec<String> + Send,
    ) -> Result<Action>
    where
        R: ManagedResource,
    {
        R::validate(desired)?;

        let Some(identity) = state.identity(R::KIND, name) else {
            return Ok(Action::new(ActionType::Create, R::KIND, name));
        };

        // Compare against the server's copy alone, so fields removed out of
        // band show up as drift instead of being filled in from the declaration
        match reconciler.read(identity, None).await? {
            None => Ok(Action::new(ActionType::Create, R::KIND, name)
                .with_identity(identity)
                .with_changes(vec!["サーバー上に存在しないため再作成します".to_string()])),
            Some(observed) => {
                let changes = drift(desired, &observed);
                let action_type = if changes.is_empty() {
                    ActionType::NoOp
                } else {
                    ActionType::Update
                };
                Ok(Action::new(action_type, R::KIND, name)
                    .with_identity(identity)
                    .with_changes(changes))
            }
        }
    }

    /// `team_recreated`: the declared team is planned as a create, so every
    /// member has to be added to the new team
    fn plan_member_set(
        name: &str,
        spec: &MemberSetSpec,
        state: &GlobalState,
        team_recreated: bool,
    ) -> Action {
        let tracked = state.get(ResourceKind::TeamMembers, name);
        let previous = if team_recreated {
            MembershipSet::new()
        } else {
            previous_members(tracked, resolve_team(&spec.team, state).as_deref())
        };
        let changes = diff(&previous, &spec.members);

        let action_type = match tracked {
            None => ActionType::Create,
            Some(_) if changes.is_empty() => ActionType::NoOp,
            Some(_) => ActionType::Update,
        };
        let mut described = changes.describe();
        if team_recreated && tracked.is_some() {
            described.insert(0, format!("{} の再作成に合わせて追加し直します", spec.team));
        }
        let action = Action::new(action_type, ResourceKind::TeamMembers, name)
            .with_changes(described);
        match tracked {
            Some(t) => action.with_identity(&t.identity),
            None => action,
        }
    }

    async fn converge_resource<R>(
        reconciler: &Reconciler<R>,
        name: &str,
        desired: &R::Desired,
        existing: Option<String>,
        state: &mut GlobalState,
    ) -> Result<String>
    where
        R: ManagedResource,
        R::Tracked: Serialize,
    {
        match reconciler.converge(desired, existing.as_deref()).await {
            Ok(converged) => {
                let attributes = serde_json::to_value(&converged.state)?;
                record(state, R::KIND, name, &converged.identity, attributes);
                Ok(match converged.outcome {
                    WriteOutcome::Created => format!("{} '{}' を作成しました", R::KIND, name),
                    WriteOutcome::Updated => format!("{} '{}' を更新しました", R::KIND, name),
                    WriteOutcome::Recreated => {
                        format!("{} '{}' を再作成しました", R::KIND, name)
                    }
                })
            }
            Err(e) => {
                if let Some(identity) = e.assigned_identity() {
                    record(state, R::KIND, name, identity, serde_json::Value::Null);
                }
                Err(e)
            }
        }
    }

    async fn converge_members(
        &self,
        name: &str,
        spec: &MemberSetSpec,
        state: &mut GlobalState,
    ) -> Result<String> {
        let team_id = resolve_team(&spec.team, state).ok_or_else(|| {
            CloudError::InvalidConfig(format!("{} has no remote id yet", spec.team))
        })?;

        let tracked = state.get(ResourceKind::TeamMembers, name).cloned();
        let mut applied = previous_members(tracked.as_ref(), Some(&team_id));

        let outcome = self.members.converge(&team_id, spec, &mut applied).await;

        // Whatever landed is the baseline for the next run, even on failure
        let mut entry =
            tracked.unwrap_or_else(|| ResourceState::new(ResourceKind::TeamMembers, &team_id));
        entry.refresh(
            &team_id,
            serde_json::json!({
                "team_id": team_id,
                "max_budget_in_team": spec.max_budget_in_team,
            }),
        );
        entry.members = Some(applied);
        state.set(name, entry);

        let changes = outcome?;
        Ok(format!(
            "team-members '{}': {} 件削除, {} 件追加",
            name,
            changes.to_remove.len(),
            changes.to_add.len()
        ))
    }

    async fn delete_tracked(
        &self,
        kind: ResourceKind,
        name: &str,
        state: &mut GlobalState,
    ) -> Result<String> {
        let Some(tracked) = state.get(kind, name).cloned() else {
            return Ok(format!("{kind} '{name}' は state に存在しません"));
        };

        match kind {
            ResourceKind::Model => self.models.delete(&tracked.identity).await?,
            ResourceKind::Team => self.teams.delete(&tracked.identity).await?,
            ResourceKind::Key => self.keys.delete(&tracked.identity).await?,
            ResourceKind::TeamMembers => {
                let mut applied = tracked.members.clone().unwrap_or_default();
                let outcome = self.members.delete(&tracked.identity, &mut applied).await;
                if outcome.is_err() {
                    let mut entry = tracked.clone();
                    entry.members = Some(applied);
                    state.set(name, entry);
                }
                outcome?;
            }
        }

        state.remove(kind, name);
        Ok(format!("{kind} '{name}' を削除しました"))
    }

    async fn apply_action(
        &self,
        action: &Action,
        desired: &ResourceSet,
        state: &mut GlobalState,
    ) -> Result<String> {
        let name = action.name.as_str();
        let missing = || {
            CloudError::InvalidConfig(format!("{} is not declared", action.address()))
        };
        // A create starts over even if state still remembers a lost identity
        let existing = match action.action_type {
            ActionType::Update => state.identity(action.kind, name).map(str::to_string),
            _ => None,
        };

        match (action.action_type, action.kind) {
            (ActionType::NoOp, _) => Ok(format!("{} は変更なし", action.address())),
            (ActionType::Delete, kind) => self.delete_tracked(kind, name, state).await,
            (_, ResourceKind::Model) => {
                let spec = desired.models.get(name).ok_or_else(missing)?;
                Self::converge_resource(&self.models, name, spec, existing, state).await
            }
            (_, ResourceKind::Team) => {
                let spec = desired.teams.get(name).ok_or_else(missing)?;
                Self::converge_resource(&self.teams, name, spec, existing, state).await
            }
            (_, ResourceKind::Key) => {
                let spec = desired.keys.get(name).ok_or_else(missing)?;
                let spec = resolve_key(spec, state);
                Self::converge_resource(&self.keys, name, &spec, existing, state).await
            }
            (_, ResourceKind::TeamMembers) => {
                let spec = desired.member_sets.get(name).ok_or_else(missing)?;
                self.converge_members(name, spec, state).await
            }
        }
    }

    async fn refresh_resource<R>(
        reconciler: &Reconciler<R>,
        tracked: &ResourceState,
    ) -> Result<Option<serde_json::Value>>
    where
        R: ManagedResource,
        R::Desired: DeserializeOwned,
        R::Tracked: Serialize,
    {
        let previous: Option<R::Desired> = tracked.attributes_as();
        match reconciler.read(&tracked.identity, previous.as_ref()).await? {
            Some(observed) => Ok(Some(serde_json::to_value(&observed)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GatewayProvider for LiteLlmProvider {
    fn name(&self) -> &str {
        "litellm"
    }

    fn display_name(&self) -> &str {
        "LiteLLM Proxy"
    }

    async fn plan(&self, desired: &ResourceSet, state: &GlobalState) -> Result<Plan> {
        let mut actions = Vec::new();

        for kind in APPLY_ORDER {
            match kind {
                ResourceKind::Model => {
                    for (name, spec) in &desired.models {
                        actions.push(
                            Self::plan_resource(&self.models, name, spec, state, |d, o| d.drift(o))
                                .await?,
                        );
                    }
                }
                ResourceKind::Team => {
                    for (name, spec) in &desired.teams {
                        actions.push(
                            Self::plan_resource(&self.teams, name, spec, state, |d, o| d.drift(o))
                                .await?,
                        );
                    }
                }
                ResourceKind::TeamMembers => {
                    for (name, spec) in &desired.member_sets {
                        let team_recreated = team_planned_create(&actions, Some(&spec.team));
                        actions.push(Self::plan_member_set(name, spec, state, team_recreated));
                    }
                }
                ResourceKind::Key => {
                    for (name, declared) in &desired.keys {
                        let spec = resolve_key(declared, state);
                        let action =
                            Self::plan_resource(&self.keys, name, &spec, state, |d, o| d.drift(o))
                                .await?;
                        let action = if action.action_type == ActionType::NoOp
                            && team_planned_create(&actions, declared.team.as_ref())
                        {
                            rebind(&action)
                        } else {
                            action
                        };
                        actions.push(action);
                    }
                }
            }
        }

        for kind in APPLY_ORDER.iter().rev() {
            for (name, tracked) in state.of_kind(*kind) {
                if !desired.contains(*kind, &name) {
                    actions.push(
                        Action::new(ActionType::Delete, *kind, name)
                            .with_identity(&tracked.identity),
                    );
                }
            }
        }

        Ok(Plan::new(actions))
    }

    async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut GlobalState,
    ) -> Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        for planned in &plan.actions {
            // A recreate earlier in this run can leave a no-op pointing at a dead team
            let rebound;
            let action = match planned.action_type {
                ActionType::NoOp if follows_moved_team(planned, desired, state) => {
                    rebound = rebind(planned);
                    &rebound
                }
                ActionType::NoOp => continue,
                _ => planned,
            };
            tracing::info!("{}", action.description);
            match self.apply_action(action, desired, state).await {
                Ok(message) => result.add_success(action, message),
                Err(e) => {
                    tracing::error!(address = %action.address(), error = %e, "action failed");
                    result.add_failure(action, e.to_string());
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn refresh(&self, state: &mut GlobalState) -> Result<RefreshResult> {
        let mut result = RefreshResult::default();

        for kind in APPLY_ORDER {
            let tracked: Vec<(String, ResourceState)> = state
                .of_kind(kind)
                .into_iter()
                .map(|(name, t)| (name, t.clone()))
                .collect();

            for (name, tracked) in tracked {
                let address = gateflow_cloud::state::address(kind, &name);

                let refreshed = match kind {
                    ResourceKind::Model => Self::refresh_resource(&self.models, &tracked).await?,
                    ResourceKind::Team => Self::refresh_resource(&self.teams, &tracked).await?,
                    ResourceKind::Key => Self::refresh_resource(&self.keys, &tracked).await?,
                    ResourceKind::TeamMembers => {
                        match self.members.read(&tracked.identity).await? {
                            Some(remote) => {
                                let applied = tracked.members.clone().unwrap_or_default();
                                let drift = diff(&applied, &remote);
                                if !drift.is_empty() {
                                    tracing::warn!(
                                        address = %address,
                                        changes = ?drift.describe(),
                                        "membership differs from last apply"
                                    );
                                }
                                Some(tracked.attributes.clone())
                            }
                            None => None,
                        }
                    }
                };

                match refreshed {
                    Some(attributes) => {
                        record(state, kind, &name, &tracked.identity, attributes);
                        result.refreshed.push(address);
                    }
                    None => {
                        tracing::warn!(address = %address, "removed from state, gone on server");
                        state.remove(kind, &name);
                        result.removed.push(address);
                    }
                }
            }
        }

        Ok(result)
    }

    async fn destroy_all(&self, state: &mut GlobalState) -> Result<ApplyResult> {
        let nothing = ResourceSet::new();
        let plan = self.plan(&nothing, state).await?;
        self.apply(&plan, &nothing, state).await
    }
}

/// Team id a reference points at, if known
fn resolve_team(team: &TeamRef, state: &GlobalState) -> Option<String> {
    match team {
        TeamRef::Id(id) => Some(id.clone()),
        TeamRef::Declared(name) => state
            .identity(ResourceKind::Team, name)
            .map(str::to_string),
    }
}

/// Key spec with its team reference replaced by the team id when known
fn resolve_key(spec: &KeySpec, state: &GlobalState) -> KeySpec {
    let mut spec = spec.clone();
    if let Some(team) = &spec.team
        && let Some(id) = resolve_team(team, state)
    {
        spec.team = Some(TeamRef::Id(id));
    }
    spec
}

/// Whether `team` names a declared team that the plan creates
fn team_planned_create(actions: &[Action], team: Option<&TeamRef>) -> bool {
    let Some(TeamRef::Declared(team)) = team else {
        return false;
    };
    actions.iter().any(|a| {
        a.kind == ResourceKind::Team && a.name == *team && a.action_type == ActionType::Create
    })
}

/// Whether a planned no-op still refers to the team id its declared team had
/// before this apply
fn follows_moved_team(action: &Action, desired: &ResourceSet, state: &GlobalState) -> bool {
    match action.kind {
        ResourceKind::TeamMembers => {
            let Some(spec) = desired.member_sets.get(&action.name) else {
                return false;
            };
            let tracked = state.identity(ResourceKind::TeamMembers, &action.name);
            resolve_team(&spec.team, state).is_some_and(|id| tracked != Some(id.as_str()))
        }
        ResourceKind::Key => {
            let Some(spec) = desired.keys.get(&action.name) else {
                return false;
            };
            let applied = state
                .get(ResourceKind::Key, &action.name)
                .and_then(|t| t.attributes_as::<KeySpec>())
                .and_then(|k| k.team);
            match (resolve_key(spec, state).team, applied) {
                (Some(want), Some(had)) => want != had,
                _ => false,
            }
        }
        ResourceKind::Model | ResourceKind::Team => false,
    }
}

/// Update that re-attaches a resource to its recreated team
fn rebind(action: &Action) -> Action {
    let rebound = Action::new(ActionType::Update, action.kind, &action.name)
        .with_changes(vec!["チームの再作成に合わせて付け替えます".to_string()]);
    match &action.identity {
        Some(identity) => rebound.with_identity(identity),
        None => rebound,
    }
}

/// Last applied membership, or empty when the member set now targets another team
fn previous_members(tracked: Option<&ResourceState>, team_id: Option<&str>) -> MembershipSet {
    match (tracked, team_id) {
        (Some(t), Some(id)) if t.identity == id => t.members.clone().unwrap_or_default(),
        _ => MembershipSet::new(),
    }
}

fn record(
    state: &mut GlobalState,
    kind: ResourceKind,
    name: &str,
    identity: &str,
    attributes: serde_json::Value,
) {
    let entry = match state.get(kind, name).cloned() {
        Some(mut existing) => {
            existing.refresh(identity, attributes);
            existing
        }
        None => {
            let mut created = ResourceState::new(kind, identity);
            created.attributes = attributes;
            created
        }
    };
    state.set(name, entry);
}
