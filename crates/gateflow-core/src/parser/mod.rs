//! KDLパーサー
//!
//! gate.kdl をパースして [`Declarations`] を生成します。
//! 各ノードタイプのパース処理はモジュールに分離されています。

mod gateway;
mod key;
mod model;
mod team;
mod value;

pub use gateway::parse_gateway;
pub use key::parse_key;
pub use model::parse_model;
pub use team::{parse_team, parse_team_members};

use crate::error::{FlowError, Result};
use crate::model::Declarations;
use gateflow_cloud::ResourceKind;
use gateflow_cloud::state::address;
use kdl::KdlDocument;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// KDLファイルをパースして宣言を生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Declarations> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| FlowError::IoError {
        path: path.as_ref().to_path_buf(),
        message: e.to_string(),
    })?;
    parse_kdl_string(&content)
}

/// KDL文字列をパース
///
/// 参照の検証は行いません。[`Declarations::validate`] を参照してください。
pub fn parse_kdl_string(content: &str) -> Result<Declarations> {
    let doc: KdlDocument = content.parse()?;
    let mut decl = Declarations::new();

    for node in doc.nodes() {
        match node.name().value() {
            "gateway" => {
                decl.gateway = parse_gateway(node)?;
            }
            "model" => {
                let (name, model) = parse_model(node)?;
                insert_unique(&mut decl.resources.models, ResourceKind::Model, name, model)?;
            }
            "team" => {
                let (name, team) = parse_team(node)?;
                insert_unique(&mut decl.resources.teams, ResourceKind::Team, name, team)?;
            }
            "team-members" | "team_members" => {
                let (name, members) = parse_team_members(node)?;
                insert_unique(
                    &mut decl.resources.member_sets,
                    ResourceKind::TeamMembers,
                    name,
                    members,
                )?;
            }
            "key" => {
                let (name, key) = parse_key(node)?;
                insert_unique(&mut decl.resources.keys, ResourceKind::Key, name, key)?;
            }
            other => {
                warn!(node = other, "unknown top-level node ignored");
            }
        }
    }

    Ok(decl)
}

/// 同じ名前の宣言は上書きせずエラーにする
fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    kind: ResourceKind,
    name: String,
    value: T,
) -> Result<()> {
    if map.contains_key(&name) {
        return Err(FlowError::DuplicateResource(address(kind, &name)));
    }
    map.insert(name, value);
    Ok(())
}

#[cfg(test)]
mod tests;
