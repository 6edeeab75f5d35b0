use thiserror::Error;

use warden_core::UserId;

use crate::{AccessClaims, Permission, PermissionSet};

/// The authenticated caller, derived from a verified access token.
///
/// Permissions are the snapshot embedded in the token, not a live lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub permissions: PermissionSet,
}

impl From<AccessClaims> for Principal {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.user_id,
            permissions: claims.permissions,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Pure policy check: the principal holds `required` or the `*` wildcard.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(perms: &[&'static str]) -> Principal {
        Principal {
            user_id: UserId::new(1),
            permissions: perms.iter().map(|p| Permission::new(*p)).collect(),
        }
    }

    #[test]
    fn explicit_permission_grants() {
        let p = principal(&["account.lock"]);
        assert!(authorize(&p, &Permission::new("account.lock")).is_ok());
    }

    #[test]
    fn wildcard_grants_everything() {
        let p = principal(&["*"]);
        assert!(authorize(&p, &Permission::new("anything.at.all")).is_ok());
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let p = principal(&["read"]);
        assert_eq!(
            authorize(&p, &Permission::new("account.lock")),
            Err(AuthzError::Forbidden("account.lock".to_string()))
        );
    }
}
