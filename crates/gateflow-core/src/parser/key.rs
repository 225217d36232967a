//! key ノードのパース

use super::value::{boolean, field_name, integer, number, resource_name, string, string_map, strings};
use crate::error::{FlowError, Result};
use gateflow_cloud::{KeySpec, TeamRef};
use kdl::KdlNode;

/// key ノードをパース
///
/// キー文字列はゲートウェイが生成するため、宣言には書きません。
pub fn parse_key(node: &KdlNode) -> Result<(String, KeySpec)> {
    let name = resource_name(node)?;
    let address = format!("key.{name}");

    let mut key = KeySpec {
        key_alias: Some(name.clone()),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match field_name(child).as_str() {
                "alias" | "key_alias" => key.key_alias = Some(string(child, &address)?),
                "models" => key.models = Some(strings(child, &address)?),
                "max_budget" => key.max_budget = Some(number(child, &address)?),
                "soft_budget" => key.soft_budget = Some(number(child, &address)?),
                "user_id" => key.user_id = Some(string(child, &address)?),
                "team" => key.team = Some(TeamRef::Declared(string(child, &address)?)),
                "team_id" => key.team = Some(TeamRef::Id(string(child, &address)?)),
                "max_parallel_requests" => {
                    key.max_parallel_requests = Some(integer(child, &address)?)
                }
                "metadata" => key.metadata = Some(string_map(child, &address)?),
                "tpm_limit" => key.tpm_limit = Some(integer(child, &address)?),
                "rpm_limit" => key.rpm_limit = Some(integer(child, &address)?),
                "budget_duration" => key.budget_duration = Some(string(child, &address)?),
                "duration" => key.duration = Some(string(child, &address)?),
                "guardrails" => key.guardrails = Some(strings(child, &address)?),
                "tags" => key.tags = Some(strings(child, &address)?),
                "blocked" => key.blocked = Some(boolean(child, &address)?),
                other => {
                    return Err(FlowError::UnknownField {
                        address,
                        field: other.to_string(),
                    });
                }
            }
        }
    }

    Ok((name, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        let doc: kdl::KdlDocument = r#"
            key "ci-bot" {
                team "research"
                models "gpt-4"
                max_budget 10
                soft_budget 8.5
                duration "30d"
                max_parallel_requests 4
                tags "ci" "automation"
                blocked #false
            }
        "#
        .parse()
        .unwrap();
        let (name, key) = parse_key(doc.nodes().first().unwrap()).unwrap();

        assert_eq!(name, "ci-bot");
        assert_eq!(key.key_alias.as_deref(), Some("ci-bot"));
        assert_eq!(key.team, Some(TeamRef::Declared("research".to_string())));
        assert_eq!(key.max_budget, Some(10.0));
        assert_eq!(key.soft_budget, Some(8.5));
        assert_eq!(key.duration.as_deref(), Some("30d"));
        assert_eq!(key.max_parallel_requests, Some(4));
        assert_eq!(key.tags.as_ref().map(|t| t.len()), Some(2));
        assert_eq!(key.blocked, Some(false));
    }

    #[test]
    fn test_negative_integer_is_rejected() {
        let doc: kdl::KdlDocument = r#"key "k" { tpm_limit -5; }"#.parse().unwrap();
        let result = parse_key(doc.nodes().first().unwrap());
        assert!(
            matches!(result, Err(FlowError::InvalidValue { ref field, .. }) if field == "tpm_limit")
        );
    }
}
