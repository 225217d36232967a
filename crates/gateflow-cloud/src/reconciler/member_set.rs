//! Team membership convergence

use super::ApiClient;
use crate::diff::{MembershipDiff, diff};
use crate::error::{CloudError, Result};
use crate::resource::{
    ManagedResource, MemberSetSpec, MembershipEntry, MembershipSet, RemoteMember, ResourceKind,
    TeamResource, from_body, team_info, to_payload,
};
use crate::transport::ApiRequest;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

const MEMBER_ADD: &str = "/team/member_add";
const MEMBER_DELETE: &str = "/team/member_delete";

#[derive(Debug, Serialize)]
struct MemberAddRequest<'a> {
    team_id: &'a str,
    member: &'a [MembershipEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_budget_in_team: Option<f64>,
}

/// Applies membership diffs to a team
#[derive(Clone)]
pub struct MemberSetReconciler {
    client: ApiClient,
}

impl MemberSetReconciler {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Move the team from `applied` to `desired.members`.
    ///
    /// Removes run first, one call each, and stop at the first failure.
    /// New members are then added in one call. `applied` is updated after
    /// every successful call, so on error it holds what actually landed.
    pub async fn converge(
        &self,
        team_id: &str,
        desired: &MemberSetSpec,
        applied: &mut MembershipSet,
    ) -> Result<MembershipDiff> {
        let changes = diff(applied, &desired.members);
        if changes.is_empty() {
            debug!(team_id, "membership unchanged");
            return Ok(changes);
        }

        for key in changes.role_changes() {
            info!(team_id, member = %key, "role change applied as remove and add");
        }

        for entry in &changes.to_remove {
            self.remove_member(team_id, entry).await?;
            if let Some(key) = entry.identity_key() {
                applied.remove(&key);
            }
        }

        if !changes.to_add.is_empty() {
            let payload = to_payload(&MemberAddRequest {
                team_id,
                member: &changes.to_add,
                max_budget_in_team: desired.max_budget_in_team,
            })?;
            self.client
                .call(ResourceKind::TeamMembers, ApiRequest::post(MEMBER_ADD, payload))
                .await?;
            info!(team_id, count = changes.to_add.len(), "members added");

            for entry in &changes.to_add {
                applied.replace(entry.clone())?;
            }
        }

        Ok(changes)
    }

    async fn remove_member(&self, team_id: &str, entry: &MembershipEntry) -> Result<()> {
        let key = entry.identity_key().ok_or_else(|| {
            CloudError::InvalidConfig("member needs user_id or user_email".to_string())
        })?;

        let mut body = serde_json::Map::new();
        body.insert("team_id".to_string(), Value::String(team_id.to_string()));
        body.insert(key.field().to_string(), Value::String(key.value().to_string()));

        let request = ApiRequest::post(MEMBER_DELETE, Value::Object(body));
        match self.client.call(ResourceKind::TeamMembers, request).await {
            Ok(_) => {
                info!(member = %key.composite(team_id), "member removed");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(member = %key.composite(team_id), "member already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Members the gateway currently reports for the team.
    /// `Ok(None)` when the team itself is gone.
    pub async fn read(&self, team_id: &str) -> Result<Option<MembershipSet>> {
        let request = TeamResource::ENDPOINTS.read_request(team_id);
        let body = match self
            .client
            .call(ResourceKind::TeamMembers, request)
            .await
        {
            Ok(body) => team_info(body),
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let members = match body.get("members_with_roles") {
            Some(Value::Array(items)) => from_body::<Vec<RemoteMember>>(Value::Array(items.clone()))?,
            _ => Vec::new(),
        };

        let mut set = MembershipSet::new();
        for member in members {
            let Some(entry) = member.into_entry() else {
                debug!(team_id, "skipping member without identity or with unknown role");
                continue;
            };
            if let Err(e) = set.insert(entry) {
                warn!(team_id, error = %e, "skipping member reported twice");
            }
        }
        Ok(Some(set))
    }

    /// Remove every member in `applied`
    pub async fn delete(&self, team_id: &str, applied: &mut MembershipSet) -> Result<()> {
        let entries: Vec<MembershipEntry> = applied.iter().cloned().collect();
        for entry in entries {
            self.remove_member(team_id, &entry).await?;
            if let Some(key) = entry.identity_key() {
                applied.remove(&key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MemberRole, TeamRef};
    use crate::testing::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn set(entries: &[(&str, MemberRole)]) -> MembershipSet {
        MembershipSet::from_entries(
            entries
                .iter()
                .map(|(id, role)| MembershipEntry::user(*id, *role)),
        )
        .unwrap()
    }

    fn spec(members: MembershipSet) -> MemberSetSpec {
        MemberSetSpec {
            team: TeamRef::Id("t-1".to_string()),
            members,
            max_budget_in_team: Some(10.0),
        }
    }

    #[tokio::test]
    async fn test_remove_then_add() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(200, json!({}));
        mock.respond(200, json!({}));
        mock.respond(200, json!({}));

        let reconciler = MemberSetReconciler::new(ApiClient::new(mock.clone()));
        let mut applied = set(&[("A", MemberRole::Admin), ("B", MemberRole::User)]);
        let desired = spec(set(&[("B", MemberRole::Admin), ("C", MemberRole::User)]));

        reconciler.converge("t-1", &desired, &mut applied).await.unwrap();

        let requests = mock.requests();
        assert_eq!(
            mock.paths(),
            vec![MEMBER_DELETE, MEMBER_DELETE, MEMBER_ADD]
        );
        assert_eq!(requests[0].body, Some(json!({"team_id": "t-1", "user_id": "A"})));
        assert_eq!(requests[1].body, Some(json!({"team_id": "t-1", "user_id": "B"})));
        assert_eq!(
            requests[2].body,
            Some(json!({
                "team_id": "t-1",
                "member": [
                    {"user_id": "B", "role": "admin"},
                    {"user_id": "C", "role": "user"}
                ],
                "max_budget_in_team": 10.0
            }))
        );
        assert_eq!(applied, desired.members);
    }

    #[tokio::test]
    async fn test_no_change_no_calls() {
        let mock = Arc::new(MockTransport::new());
        let reconciler = MemberSetReconciler::new(ApiClient::new(mock.clone()));
        let mut applied = set(&[("A", MemberRole::Admin)]);

        let changes = reconciler
            .converge("t-1", &spec(applied.clone()), &mut applied)
            .await
            .unwrap();
        assert!(changes.is_empty());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remove_stops_everything() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(200, json!({}));
        mock.respond_error(500, "database unavailable");

        let reconciler = MemberSetReconciler::new(ApiClient::new(mock.clone()));
        let mut applied = set(&[("A", MemberRole::User), ("B", MemberRole::User)]);
        let desired = spec(set(&[("C", MemberRole::User)]));

        let err = reconciler
            .converge("t-1", &desired, &mut applied)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Api { status: 500, .. }));
        assert_eq!(mock.paths(), vec![MEMBER_DELETE, MEMBER_DELETE]);
        // A is gone, B is still there, C was never added
        assert_eq!(applied, set(&[("B", MemberRole::User)]));
    }

    #[tokio::test]
    async fn test_remove_of_absent_member_succeeds() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_raw(404, "");

        let reconciler = MemberSetReconciler::new(ApiClient::new(mock.clone()));
        let mut applied = set(&[("A", MemberRole::User)]);
        reconciler
            .converge("t-1", &spec(MembershipSet::new()), &mut applied)
            .await
            .unwrap();
        assert!(applied.is_empty());
    }

    #[tokio::test]
    async fn test_email_identity_is_used_for_remove() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(200, json!({}));

        let reconciler = MemberSetReconciler::new(ApiClient::new(mock.clone()));
        let mut applied = MembershipSet::from_entries([MembershipEntry {
            user_id: None,
            user_email: Some("a@example.com".to_string()),
            role: MemberRole::User,
        }])
        .unwrap();
        reconciler.delete("t-1", &mut applied).await.unwrap();

        assert_eq!(
            mock.requests()[0].body,
            Some(json!({"team_id": "t-1", "user_email": "a@example.com"}))
        );
        assert!(applied.is_empty());
    }

    #[tokio::test]
    async fn test_read_members() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            200,
            json!({
                "team_id": "t-1",
                "team_info": {
                    "team_id": "t-1",
                    "members_with_roles": [
                        {"user_id": "A", "role": "admin"},
                        {"user_id": "B", "role": "user", "user_email": null},
                        {"user_id": "X", "role": "owner"}
                    ]
                }
            }),
        );
        mock.respond_error(400, "Team with id=t-2 not found in db");

        let reconciler = MemberSetReconciler::new(ApiClient::new(mock.clone()));
        let members = reconciler.read("t-1").await.unwrap().unwrap();
        assert_eq!(
            members,
            set(&[("A", MemberRole::Admin), ("B", MemberRole::User)])
        );
        assert!(reconciler.read("t-2").await.unwrap().is_none());
    }
}
