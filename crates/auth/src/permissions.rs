use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "account.lock").
/// A special wildcard permission `"*"` grants everything at authorization
/// time; for staleness comparison it is just another name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unordered, duplicate-free collection of permissions held by a user at a
/// point in time.
///
/// Serialized as a sorted JSON array; duplicates in the input collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Set equality by permission name: order is irrelevant and duplicates collapse.
pub fn sets_equal<'a, A, B>(a: A, b: B) -> bool
where
    A: IntoIterator<Item = &'a Permission>,
    B: IntoIterator<Item = &'a Permission>,
{
    let a: BTreeSet<&str> = a.into_iter().map(Permission::as_str).collect();
    let b: BTreeSet<&str> = b.into_iter().map(Permission::as_str).collect();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn perms(names: &[&'static str]) -> Vec<Permission> {
        names.iter().map(|n| Permission::new(*n)).collect()
    }

    #[test]
    fn duplicates_collapse() {
        let set: PermissionSet = perms(&["read", "read", "write"]).into_iter().collect();
        assert_eq!(set.len(), 2);
        let names: Vec<&str> = set.iter().map(Permission::as_str).collect();
        assert_eq!(names, vec!["read", "write"]);
    }

    #[test]
    fn order_is_irrelevant() {
        assert!(sets_equal(&perms(&["a", "b"]), &perms(&["b", "a"])));
    }

    #[test]
    fn renamed_permission_is_a_difference() {
        assert!(!sets_equal(&perms(&["read"]), &perms(&["reads"])));
    }

    #[test]
    fn subset_is_not_equal() {
        assert!(!sets_equal(&perms(&["read"]), &perms(&["read", "write"])));
        assert!(!sets_equal(&perms(&["read", "write"]), &perms(&["read"])));
    }

    #[test]
    fn duplicates_do_not_mask_missing_names() {
        // Same cardinality once duplicates are counted, but different membership.
        assert!(!sets_equal(&perms(&["read", "read"]), &perms(&["read", "write"])));
    }

    #[test]
    fn serializes_as_sorted_array() {
        let set: PermissionSet = perms(&["write", "read"]).into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["read","write"]"#);

        let back: PermissionSet = serde_json::from_str(r#"["write","read","read"]"#).unwrap();
        assert_eq!(back, set);
    }

    proptest! {
        #[test]
        fn equal_under_permutation_and_duplication(
            names in proptest::collection::vec("[a-z]{1,6}", 0..12),
            seed in any::<u64>(),
        ) {
            let a: Vec<Permission> = names.iter().cloned().map(Permission::new).collect();
            let mut b = a.clone();
            // Deterministic shuffle + duplicate the first element, if any.
            let n = b.len();
            if n > 1 {
                let k = (seed as usize) % n;
                b.rotate_left(k);
            }
            if let Some(first) = b.first().cloned() {
                b.push(first);
            }
            prop_assert!(sets_equal(&a, &b));
        }

        #[test]
        fn extra_name_breaks_equality(
            names in proptest::collection::vec("[a-z]{1,6}", 0..12),
        ) {
            let a: Vec<Permission> = names.iter().cloned().map(Permission::new).collect();
            let mut b = a.clone();
            b.push(Permission::new("ZZZ-extra"));
            prop_assert!(!sets_equal(&a, &b));
        }
    }
}
