//! User accounts as seen by the token layer.

use serde::{Deserialize, Serialize};
use tracing::info;

use warden_core::UserId;

use crate::{AccountStore, IssueError, TokenRegistrationStore};

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account can authenticate and refresh tokens.
    #[default]
    Active,
    /// Account is locked: no new sessions, refresh fails closed.
    Locked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Locked => "locked",
        }
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AccountStatus {
    type Err = warden_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "locked" => Ok(AccountStatus::Locked),
            other => Err(warden_core::DomainError::validation(format!(
                "unknown account status '{other}'"
            ))),
        }
    }
}

/// An account that can be tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub login: String,
    pub display_name: String,
    /// PHC-formatted password hash (argon2).
    pub password_hash: String,
    pub status: AccountStatus,
}

/// Input for [`AccountStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub login: String,
    pub display_name: String,
    /// PHC-formatted password hash (argon2).
    pub password_hash: String,
}

impl Account {
    pub fn is_locked(&self) -> bool {
        self.status == AccountStatus::Locked
    }
}

/// Lock an account and revoke every token lineage it owns.
///
/// Returns the number of revoked registrations. Outstanding refresh tokens
/// stop working because their registration no longer exists.
pub async fn lock_account(
    accounts: &dyn AccountStore,
    registrations: &dyn TokenRegistrationStore,
    user_id: UserId,
) -> Result<u64, IssueError> {
    if !accounts.set_status(user_id, AccountStatus::Locked).await? {
        return Err(IssueError::NotFound);
    }
    let revoked = registrations.revoke_by_user_id(user_id).await?;
    info!(%user_id, revoked, "account locked");
    Ok(revoked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [AccountStatus::Active, AccountStatus::Locked] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<AccountStatus>().is_err());
    }
}
