use super::GatewaySettings;
use crate::error::{FlowError, Result};
use gateflow_cloud::resource::{KeyResource, ModelResource, TeamResource};
use gateflow_cloud::state::address;
use gateflow_cloud::{ManagedResource, ResourceKind, ResourceSet, TeamRef};
use tracing::debug;

/// gate.kdl 全体の宣言
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub gateway: GatewaySettings,
    pub resources: ResourceSet,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// 宣言同士の整合性を検証
    ///
    /// - 各リソースの属性（モデル名の導出、予算の符号など）
    /// - team-members と key が参照するチームが宣言されていること
    pub fn validate(&self) -> Result<()> {
        let set = &self.resources;

        for (name, spec) in &set.models {
            ModelResource::validate(spec).map_err(|source| FlowError::InvalidResource {
                address: address(ResourceKind::Model, name),
                source,
            })?;
        }

        for (name, spec) in &set.teams {
            TeamResource::validate(spec).map_err(|source| FlowError::InvalidResource {
                address: address(ResourceKind::Team, name),
                source,
            })?;
        }

        for (name, spec) in &set.member_sets {
            self.check_team_ref(ResourceKind::TeamMembers, name, Some(&spec.team))?;
        }

        for (name, spec) in &set.keys {
            KeyResource::validate(spec).map_err(|source| FlowError::InvalidResource {
                address: address(ResourceKind::Key, name),
                source,
            })?;
            self.check_team_ref(ResourceKind::Key, name, spec.team.as_ref())?;
        }

        debug!(resources = set.len(), "declarations validated");
        Ok(())
    }

    fn check_team_ref(&self, kind: ResourceKind, name: &str, team: Option<&TeamRef>) -> Result<()> {
        match team {
            Some(TeamRef::Declared(team)) if !self.resources.teams.contains_key(team) => {
                Err(FlowError::UnknownTeam {
                    address: address(kind, name),
                    team: team.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
