use super::*;
use gateflow_cloud::{MemberRole, TeamRef};

const EXAMPLE: &str = r#"
gateway {
    api_base "https://litellm.example.com"
    timeout 10
}

model "gpt-4" {
    provider "openai"
    base_model "gpt-4"
    input_cost_per_million_tokens 30.0
}

model "claude-sonnet" {
    provider "anthropic"
    base_model "claude-3-5-sonnet"
}

team "research" {
    max_budget 100.0
    models "gpt-4" "claude-sonnet"
}

team-members "research" {
    member user_id="alice" role="admin"
    member user_id="bob" role="user"
}

key "ci" {
    team "research"
    models "gpt-4"
}
"#;

#[test]
fn test_parse_full_document() {
    let decl = parse_kdl_string(EXAMPLE).unwrap();

    assert_eq!(
        decl.gateway.api_base.as_deref(),
        Some("https://litellm.example.com")
    );
    assert_eq!(decl.gateway.timeout_secs, Some(10));
    assert_eq!(decl.resources.len(), 5);
    assert_eq!(
        decl.resources.names(ResourceKind::Model),
        vec!["claude-sonnet", "gpt-4"]
    );

    let members = &decl.resources.member_sets["research"];
    assert_eq!(members.team, TeamRef::Declared("research".to_string()));
    assert_eq!(members.members.len(), 2);
    assert!(
        members
            .members
            .iter()
            .any(|m| m.user_id.as_deref() == Some("alice") && m.role == MemberRole::Admin)
    );

    decl.validate().unwrap();
}

#[test]
fn test_empty_document() {
    let decl = parse_kdl_string("").unwrap();
    assert!(decl.resources.is_empty());
    assert_eq!(decl.gateway.api_base, None);
}

#[test]
fn test_duplicate_resource() {
    let kdl = r#"
        team "research"
        team "research" { max_budget 5; }
    "#;
    match parse_kdl_string(kdl) {
        Err(FlowError::DuplicateResource(address)) => assert_eq!(address, "team.research"),
        other => panic!("Expected DuplicateResource, got {other:?}"),
    }
}

#[test]
fn test_same_name_across_kinds_is_allowed() {
    let kdl = r#"
        team "research"
        team-members "research" { member user_id="alice" role="admin"; }
        key "research"
    "#;
    let decl = parse_kdl_string(kdl).unwrap();
    assert_eq!(decl.resources.len(), 3);
}

#[test]
fn test_unknown_team_reference() {
    let kdl = r#"
        team-members "ops" {
            member user_id="alice" role="admin"
        }
    "#;
    // パース自体は成功し、検証で失敗する
    let decl = parse_kdl_string(kdl).unwrap();
    assert!(matches!(
        decl.validate(),
        Err(FlowError::UnknownTeam { ref team, .. }) if team == "ops"
    ));
}

#[test]
fn test_unknown_top_level_node_is_ignored() {
    let kdl = r#"
        project "demo"
        team "research"
    "#;
    let decl = parse_kdl_string(kdl).unwrap();
    assert_eq!(decl.resources.len(), 1);
}

#[test]
fn test_invalid_kdl() {
    assert!(matches!(
        parse_kdl_string("team \"unterminated {"),
        Err(FlowError::KdlParse(_))
    ));
}

#[test]
fn test_parse_kdl_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gate.kdl");
    std::fs::write(&path, EXAMPLE).unwrap();

    let decl = parse_kdl_file(&path).unwrap();
    assert_eq!(decl.resources.teams.len(), 1);

    let missing = parse_kdl_file(dir.path().join("nope.kdl"));
    assert!(matches!(missing, Err(FlowError::IoError { .. })));
}

#[test]
#[serial_test::serial]
fn test_secret_from_env() {
    let kdl = r#"
        model "gpt-4" {
            provider "openai"
            base_model "gpt-4"
            api_key env="GATEFLOW_TEST_OPENAI_KEY"
        }
    "#;

    unsafe {
        std::env::remove_var("GATEFLOW_TEST_OPENAI_KEY");
    }
    match parse_kdl_string(kdl) {
        Err(FlowError::MissingEnvVar { var, address }) => {
            assert_eq!(var, "GATEFLOW_TEST_OPENAI_KEY");
            assert_eq!(address, "model.gpt-4");
        }
        other => panic!("Expected MissingEnvVar, got {other:?}"),
    }

    unsafe {
        std::env::set_var("GATEFLOW_TEST_OPENAI_KEY", "sk-from-env");
    }
    let decl = parse_kdl_string(kdl).unwrap();
    assert_eq!(
        decl.resources.models["gpt-4"].model_api_key.as_deref(),
        Some("sk-from-env")
    );

    unsafe {
        std::env::remove_var("GATEFLOW_TEST_OPENAI_KEY");
    }
}
