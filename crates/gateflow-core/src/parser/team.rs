//! team / team-members ノードのパース

use super::value::{
    boolean, field_name, integer, number, prop, resource_name, string, string_map, strings,
};
use crate::error::{FlowError, Result};
use gateflow_cloud::{MemberRole, MemberSetSpec, MembershipEntry, MembershipSet, TeamRef, TeamSpec};
use kdl::KdlNode;

/// team ノードをパース
///
/// `alias` を省略するとノード名がチーム名になります。
pub fn parse_team(node: &KdlNode) -> Result<(String, TeamSpec)> {
    let name = resource_name(node)?;
    let address = format!("team.{name}");
    let mut team = TeamSpec::new(name.clone());

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match field_name(child).as_str() {
                "alias" | "team_alias" => team.team_alias = string(child, &address)?,
                "organization_id" => team.organization_id = Some(string(child, &address)?),
                "metadata" => team.metadata = Some(string_map(child, &address)?),
                "tpm_limit" => team.tpm_limit = Some(integer(child, &address)?),
                "rpm_limit" => team.rpm_limit = Some(integer(child, &address)?),
                "max_budget" => team.max_budget = Some(number(child, &address)?),
                "budget_duration" => team.budget_duration = Some(string(child, &address)?),
                "models" => team.models = Some(strings(child, &address)?),
                "blocked" => team.blocked = Some(boolean(child, &address)?),
                other => {
                    return Err(FlowError::UnknownField {
                        address,
                        field: other.to_string(),
                    });
                }
            }
        }
    }

    Ok((name, team))
}

/// team-members ノードをパース
///
/// ```kdl
/// team-members "research" {
///     team "research"
///     max_budget_in_team 25.0
///     member user_id="alice" role="admin"
///     member user_email="bob@example.com" role="user"
/// }
/// ```
///
/// `team` も `team_id` も無い場合はノード名と同じ名前のチームを参照します。
pub fn parse_team_members(node: &KdlNode) -> Result<(String, MemberSetSpec)> {
    let name = resource_name(node)?;
    let address = format!("team-members.{name}");

    let mut team = None;
    let mut members = MembershipSet::new();
    let mut max_budget_in_team = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match field_name(child).as_str() {
                "team" => team = Some(TeamRef::Declared(string(child, &address)?)),
                "team_id" => team = Some(TeamRef::Id(string(child, &address)?)),
                "max_budget_in_team" => max_budget_in_team = Some(number(child, &address)?),
                "member" => {
                    let entry = parse_member(child, &address)?;
                    members
                        .insert(entry)
                        .map_err(|source| FlowError::InvalidResource {
                            address: address.clone(),
                            source,
                        })?;
                }
                other => {
                    return Err(FlowError::UnknownField {
                        address,
                        field: other.to_string(),
                    });
                }
            }
        }
    }

    let spec = MemberSetSpec {
        team: team.unwrap_or_else(|| TeamRef::Declared(name.clone())),
        members,
        max_budget_in_team,
    };
    Ok((name, spec))
}

/// `member user_id="alice" role="admin"`、または `member "alice" "admin"`
fn parse_member(node: &KdlNode, address: &str) -> Result<MembershipEntry> {
    let text = |key: &str| {
        prop(node, key)
            .and_then(|v| v.as_string())
            .map(|s| s.to_string())
    };
    let mut positional = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value().as_string().map(|s| s.to_string()));
    let first = positional.next().flatten();
    let second = positional.next().flatten();

    let role = text("role")
        .or(second)
        .ok_or_else(|| FlowError::MissingField {
            address: address.to_string(),
            field: "member.role".to_string(),
        })?
        .parse::<MemberRole>()
        .map_err(|e| FlowError::InvalidValue {
            address: address.to_string(),
            field: "member.role".to_string(),
            message: e.to_string(),
        })?;

    let entry = MembershipEntry {
        user_id: text("user_id").or(first),
        user_email: text("user_email"),
        role,
    };
    if entry.identity_key().is_none() {
        return Err(FlowError::MissingField {
            address: address.to_string(),
            field: "member.user_id".to_string(),
        });
    }
    Ok(entry)
}
