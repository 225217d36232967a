//! End-to-end convergence through the public API with a scripted transport

use gateflow_cloud::testing::MockTransport;
use gateflow_cloud::{
    ApiClient, GlobalState, MemberRole, MemberSetReconciler, MemberSetSpec, MembershipEntry,
    MembershipSet, ModelReconciler, ModelSpec, ResourceKind, ResourceState, TeamReconciler,
    TeamRef, TeamSpec, WriteOutcome,
};
use serde_json::json;
use std::sync::Arc;

fn members(entries: &[(&str, MemberRole)]) -> MembershipSet {
    MembershipSet::from_entries(
        entries
            .iter()
            .map(|(id, role)| MembershipEntry::user(*id, *role)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_team_lifecycle_with_state() {
    let mock = Arc::new(MockTransport::new());
    let client = ApiClient::new(mock.clone());
    let teams = TeamReconciler::new(client.clone());
    let mut state = GlobalState::new();

    // create
    mock.respond(200, json!({}));
    mock.respond(
        200,
        json!({"team_info": {"team_alias": "research", "max_budget": 100.0}}),
    );
    let spec = TeamSpec {
        max_budget: Some(100.0),
        ..TeamSpec::new("research")
    };
    let converged = teams.converge(&spec, None).await.unwrap();
    assert_eq!(converged.outcome, WriteOutcome::Created);
    state.set(
        "research",
        ResourceState::new(ResourceKind::Team, &converged.identity)
            .with_attributes(&converged.state)
            .unwrap(),
    );

    // delete of a team the server already lost still succeeds
    mock.respond_error(400, "Team with id=gone not found in db");
    let identity = state
        .identity(ResourceKind::Team, "research")
        .unwrap()
        .to_string();
    teams.delete(&identity).await.unwrap();
    state.remove(ResourceKind::Team, "research");

    assert!(state.identity(ResourceKind::Team, "research").is_none());
    assert_eq!(mock.remaining(), 0);
}

#[tokio::test]
async fn test_openai_model_scenario() {
    let mock = Arc::new(MockTransport::new());
    mock.respond(200, json!({}));
    mock.respond(
        200,
        json!({
            "model_name": "gpt-4",
            "litellm_params": {"model": "openai/gpt-4", "custom_llm_provider": "openai"},
            "model_info": {"base_model": "gpt-4"}
        }),
    );

    let models = ModelReconciler::new(ApiClient::new(mock.clone()));
    let spec = ModelSpec {
        input_cost_per_million_tokens: Some(30.0),
        ..ModelSpec::new("gpt-4", "openai", "gpt-4")
    };
    let converged = models.converge(&spec, None).await.unwrap();

    let create = mock.requests()[0].body.clone().unwrap();
    assert_eq!(create["litellm_params"]["model"], "openai/gpt-4");
    let per_token = create["litellm_params"]["input_cost_per_token"]
        .as_f64()
        .unwrap();
    assert!((per_token - 0.00003).abs() < 1e-18);
    assert_eq!(create["model_info"]["id"], converged.identity.as_str());
    // not echoed by the server, kept from the declaration
    assert_eq!(converged.state.input_cost_per_million_tokens, Some(30.0));
}

#[tokio::test]
async fn test_membership_role_swap_scenario() {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..3 {
        mock.respond(200, json!({}));
    }

    let reconciler = MemberSetReconciler::new(ApiClient::new(mock.clone()));
    let mut applied = members(&[("A", MemberRole::Admin), ("B", MemberRole::User)]);
    let desired = MemberSetSpec {
        team: TeamRef::Id("t-1".to_string()),
        members: members(&[("B", MemberRole::Admin), ("C", MemberRole::User)]),
        max_budget_in_team: None,
    };

    let changes = reconciler
        .converge("t-1", &desired, &mut applied)
        .await
        .unwrap();

    assert_eq!(changes.to_remove.len(), 2);
    assert_eq!(changes.to_add.len(), 2);
    assert_eq!(
        mock.paths(),
        vec!["/team/member_delete", "/team/member_delete", "/team/member_add"]
    );
    let add = mock.requests()[2].body.clone().unwrap();
    assert_eq!(
        add,
        json!({
            "team_id": "t-1",
            "member": [
                {"user_id": "B", "role": "admin"},
                {"user_id": "C", "role": "user"}
            ]
        })
    );

    // a second run with the same declaration is a no-op
    let changes = reconciler
        .converge("t-1", &desired, &mut applied)
        .await
        .unwrap();
    assert!(changes.is_empty());
    assert_eq!(mock.requests().len(), 3);
}
