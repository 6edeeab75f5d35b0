use warden_auth::{Permission, PermissionSet, Principal};
use warden_core::UserId;

/// Authenticated caller for a request, inserted by the bearer middleware.
///
/// Permissions come from the access token, so they may lag behind the
/// store until the client refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.principal.permissions
    }

    pub fn require(&self, permission: &Permission) -> Result<(), warden_auth::AuthzError> {
        warden_auth::authorize(&self.principal, permission)
    }
}
