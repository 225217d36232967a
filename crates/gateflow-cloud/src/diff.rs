//! Membership set diff
//!
//! Entries are compared on the full `(identity, role)` tuple. A member whose
//! role changed therefore shows up in both `to_remove` (old role) and
//! `to_add` (new role): the gateway has no role-only update, so a role
//! change is applied as remove-then-add.

use crate::resource::{IdentityKey, MembershipEntry, MembershipSet};

/// Operations needed to move a team from one membership to another
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipDiff {
    /// In previous, not in desired
    pub to_remove: Vec<MembershipEntry>,
    /// In desired, not in previous
    pub to_add: Vec<MembershipEntry>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Identities that are removed and re-added with another role
    pub fn role_changes(&self) -> Vec<IdentityKey> {
        let added: Vec<IdentityKey> = self
            .to_add
            .iter()
            .filter_map(MembershipEntry::identity_key)
            .collect();
        self.to_remove
            .iter()
            .filter_map(MembershipEntry::identity_key)
            .filter(|key| added.contains(key))
            .collect()
    }

    /// Human readable lines for plan output
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &self.to_remove {
            lines.push(format!("- {entry}"));
        }
        for entry in &self.to_add {
            lines.push(format!("+ {entry}"));
        }
        lines
    }
}

/// `to_remove = previous \ desired`, `to_add = desired \ previous`
pub fn diff(previous: &MembershipSet, desired: &MembershipSet) -> MembershipDiff {
    MembershipDiff {
        to_remove: previous
            .iter()
            .filter(|entry| !desired.contains(entry))
            .cloned()
            .collect(),
        to_add: desired
            .iter()
            .filter(|entry| !previous.contains(entry))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MemberRole;

    fn set(entries: &[(&str, MemberRole)]) -> MembershipSet {
        MembershipSet::from_entries(
            entries
                .iter()
                .map(|(id, role)| MembershipEntry::user(*id, *role)),
        )
        .unwrap()
    }

    #[test]
    fn test_identical_sets_produce_nothing() {
        let a = set(&[("a", MemberRole::Admin), ("b", MemberRole::User)]);
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_add_and_remove() {
        let previous = set(&[("a", MemberRole::Admin), ("b", MemberRole::User)]);
        let desired = set(&[("b", MemberRole::Admin), ("c", MemberRole::User)]);

        let d = diff(&previous, &desired);
        assert_eq!(
            d.to_remove,
            vec![
                MembershipEntry::user("a", MemberRole::Admin),
                MembershipEntry::user("b", MemberRole::User),
            ]
        );
        assert_eq!(
            d.to_add,
            vec![
                MembershipEntry::user("b", MemberRole::Admin),
                MembershipEntry::user("c", MemberRole::User),
            ]
        );
        assert_eq!(d.role_changes(), vec![IdentityKey::UserId("b".to_string())]);
    }

    #[test]
    fn test_unchanged_members_are_untouched() {
        let previous = set(&[("a", MemberRole::Admin), ("b", MemberRole::User)]);
        let desired = set(&[("a", MemberRole::Admin)]);

        let d = diff(&previous, &desired);
        assert_eq!(d.to_remove, vec![MembershipEntry::user("b", MemberRole::User)]);
        assert!(d.to_add.is_empty());
    }

    #[test]
    fn test_from_empty() {
        let desired = set(&[("a", MemberRole::Admin)]);
        let d = diff(&MembershipSet::new(), &desired);
        assert!(d.to_remove.is_empty());
        assert_eq!(d.to_add.len(), 1);
        assert_eq!(d.describe(), vec!["+ a (admin)".to_string()]);
    }

    #[test]
    fn test_diff_properties() {
        let previous = set(&[
            ("a", MemberRole::Admin),
            ("b", MemberRole::User),
            ("c", MemberRole::User),
        ]);
        let desired = set(&[
            ("b", MemberRole::User),
            ("c", MemberRole::Admin),
            ("d", MemberRole::User),
        ]);
        let d = diff(&previous, &desired);

        for entry in &d.to_remove {
            assert!(previous.contains(entry));
            assert!(!desired.contains(entry));
        }
        for entry in &d.to_add {
            assert!(desired.contains(entry));
            assert!(!previous.contains(entry));
        }
        // b is shared and appears in neither list
        let b = MembershipEntry::user("b", MemberRole::User);
        assert!(!d.to_remove.contains(&b));
        assert!(!d.to_add.contains(&b));
    }
}
