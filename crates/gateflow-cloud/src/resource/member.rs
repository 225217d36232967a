//! Team membership
//!
//! A team's members form a set keyed on identity: `user_id` when present,
//! otherwise `user_email`. Order carries no meaning and two entries on the
//! same identity are rejected.

use super::TeamRef;
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of a member within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    User,
    OrgAdmin,
    InternalUser,
    InternalUserViewer,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "admin",
            MemberRole::User => "user",
            MemberRole::OrgAdmin => "org_admin",
            MemberRole::InternalUser => "internal_user",
            MemberRole::InternalUserViewer => "internal_user_viewer",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberRole {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(MemberRole::Admin),
            "user" => Ok(MemberRole::User),
            "org_admin" => Ok(MemberRole::OrgAdmin),
            "internal_user" => Ok(MemberRole::InternalUser),
            "internal_user_viewer" => Ok(MemberRole::InternalUserViewer),
            other => Err(CloudError::InvalidConfig(format!(
                "unknown member role: {other}"
            ))),
        }
    }
}

/// Identity a member is addressed by
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentityKey {
    UserId(String),
    UserEmail(String),
}

impl IdentityKey {
    /// Request field carrying this identity
    pub fn field(&self) -> &'static str {
        match self {
            IdentityKey::UserId(_) => "user_id",
            IdentityKey::UserEmail(_) => "user_email",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            IdentityKey::UserId(v) | IdentityKey::UserEmail(v) => v,
        }
    }

    /// Composite `team_id:identity` used to address one member
    pub fn composite(&self, team_id: &str) -> String {
        format!("{team_id}:{}", self.value())
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.field(), self.value())
    }
}

/// One member of a team
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub role: MemberRole,
}

impl MembershipEntry {
    pub fn new(identity: IdentityKey, role: MemberRole) -> Self {
        match identity {
            IdentityKey::UserId(id) => Self {
                user_id: Some(id),
                user_email: None,
                role,
            },
            IdentityKey::UserEmail(email) => Self {
                user_id: None,
                user_email: Some(email),
                role,
            },
        }
    }

    pub fn user(user_id: impl Into<String>, role: MemberRole) -> Self {
        Self::new(IdentityKey::UserId(user_id.into()), role)
    }

    /// `user_id` if set and non-empty, else `user_email`
    pub fn identity_key(&self) -> Option<IdentityKey> {
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
        present(&self.user_id)
            .map(IdentityKey::UserId)
            .or_else(|| present(&self.user_email).map(IdentityKey::UserEmail))
    }
}

impl std::fmt::Display for MembershipEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.identity_key() {
            Some(key) => write!(f, "{} ({})", key.value(), self.role),
            None => write!(f, "<no identity> ({})", self.role),
        }
    }
}

/// Set of members keyed on identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<MembershipEntry>", try_from = "Vec<MembershipEntry>")]
pub struct MembershipSet {
    entries: BTreeMap<IdentityKey, MembershipEntry>,
}

impl MembershipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = MembershipEntry>) -> Result<Self> {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry)?;
        }
        Ok(set)
    }

    /// Add a member. Fails on a missing identity or one already present.
    pub fn insert(&mut self, entry: MembershipEntry) -> Result<()> {
        let key = entry.identity_key().ok_or_else(|| {
            CloudError::InvalidConfig("member needs user_id or user_email".to_string())
        })?;
        if self.entries.contains_key(&key) {
            return Err(CloudError::InvalidConfig(format!(
                "duplicate member: {key}"
            )));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Add or overwrite a member
    pub fn replace(&mut self, entry: MembershipEntry) -> Result<()> {
        let key = entry.identity_key().ok_or_else(|| {
            CloudError::InvalidConfig("member needs user_id or user_email".to_string())
        })?;
        self.entries.insert(key, entry);
        Ok(())
    }

    pub fn remove(&mut self, key: &IdentityKey) -> Option<MembershipEntry> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&MembershipEntry> {
        self.entries.get(key)
    }

    /// Whether the exact `(identity, role)` tuple is present
    pub fn contains(&self, entry: &MembershipEntry) -> bool {
        entry
            .identity_key()
            .and_then(|key| self.entries.get(&key))
            .is_some_and(|existing| existing.role == entry.role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MembershipEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<MembershipSet> for Vec<MembershipEntry> {
    fn from(set: MembershipSet) -> Self {
        set.entries.into_values().collect()
    }
}

impl TryFrom<Vec<MembershipEntry>> for MembershipSet {
    type Error = CloudError;

    fn try_from(entries: Vec<MembershipEntry>) -> Result<Self> {
        Self::from_entries(entries)
    }
}

/// Declared membership of one team
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSetSpec {
    pub team: TeamRef,
    pub members: MembershipSet,
    /// Per-member budget ceiling sent with every add
    pub max_budget_in_team: Option<f64>,
}

/// Entry of `members_with_roles` as the gateway reports it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteMember {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub role: Option<String>,
}

impl RemoteMember {
    /// Convert into an entry; `None` if the role is unknown or no identity is set
    pub fn into_entry(self) -> Option<MembershipEntry> {
        let role = self.role.as_deref()?.parse().ok()?;
        let entry = MembershipEntry {
            user_id: self.user_id,
            user_email: self.user_email,
            role,
        };
        entry.identity_key().map(|_| entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_user_id() {
        let entry = MembershipEntry {
            user_id: Some("u-1".to_string()),
            user_email: Some("a@example.com".to_string()),
            role: MemberRole::User,
        };
        assert_eq!(
            entry.identity_key(),
            Some(IdentityKey::UserId("u-1".to_string()))
        );

        let entry = MembershipEntry {
            user_id: Some(String::new()),
            user_email: Some("a@example.com".to_string()),
            role: MemberRole::User,
        };
        assert_eq!(
            entry.identity_key(),
            Some(IdentityKey::UserEmail("a@example.com".to_string()))
        );
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let result = MembershipSet::from_entries([
            MembershipEntry::user("a", MemberRole::Admin),
            MembershipEntry::user("a", MemberRole::User),
        ]);
        assert!(matches!(result, Err(CloudError::InvalidConfig(_))));
    }

    #[test]
    fn test_entry_without_identity_is_rejected() {
        let entry = MembershipEntry {
            user_id: None,
            user_email: None,
            role: MemberRole::User,
        };
        assert!(MembershipSet::new().insert(entry).is_err());
    }

    #[test]
    fn test_contains_compares_role() {
        let set = MembershipSet::from_entries([MembershipEntry::user("a", MemberRole::Admin)]).unwrap();
        assert!(set.contains(&MembershipEntry::user("a", MemberRole::Admin)));
        assert!(!set.contains(&MembershipEntry::user("a", MemberRole::User)));
    }

    #[test]
    fn test_serde_as_list() {
        let set = MembershipSet::from_entries([
            MembershipEntry::user("b", MemberRole::User),
            MembershipEntry::user("a", MemberRole::Admin),
        ])
        .unwrap();
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"user_id": "a", "role": "admin"},
                {"user_id": "b", "role": "user"}
            ])
        );
        let back: MembershipSet = serde_json::from_value(value).unwrap();
        assert_eq!(back, set);

        let dup = serde_json::json!([
            {"user_id": "a", "role": "admin"},
            {"user_id": "a", "role": "user"}
        ]);
        assert!(serde_json::from_value::<MembershipSet>(dup).is_err());
    }

    #[test]
    fn test_remote_member_conversion() {
        let known = RemoteMember {
            user_id: Some("u".to_string()),
            user_email: None,
            role: Some("admin".to_string()),
        };
        assert!(known.into_entry().is_some());

        let unknown_role = RemoteMember {
            user_id: Some("u".to_string()),
            user_email: None,
            role: Some("owner".to_string()),
        };
        assert!(unknown_role.into_entry().is_none());
    }

    #[test]
    fn test_composite_id() {
        let key = IdentityKey::UserEmail("a@example.com".to_string());
        assert_eq!(key.composite("t-1"), "t-1:a@example.com");
        assert_eq!(key.to_string(), "user_email=a@example.com");
    }
}
