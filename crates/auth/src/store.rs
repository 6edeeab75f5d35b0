//! Storage collaborators consumed by the issuer.
//!
//! Implementations live in `warden-infra` (in-memory and Postgres). Errors are
//! propagated unchanged by callers; retry policy, if any, belongs here.

use async_trait::async_trait;
use thiserror::Error;

use warden_core::{RegistrationId, UserId};

use crate::{
    Account, AccountStatus, NewAccount, Permission, TokenRegistration, UncommittedRegistration,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The record a write targeted no longer exists (e.g. a revoked lineage).
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Current permission names of a user (may be empty).
    async fn get_by_user_id(&self, user_id: UserId) -> StoreResult<Vec<Permission>>;
}

#[async_trait]
pub trait TokenRegistrationStore: Send + Sync {
    /// Most recently issued registration of the user, if any.
    async fn find_last_by_user_id(&self, user_id: UserId) -> StoreResult<Option<TokenRegistration>>;

    async fn find_by_id(&self, id: RegistrationId) -> StoreResult<Option<TokenRegistration>>;

    /// Insert (no id) or overwrite (id set) a registration in one atomic write.
    ///
    /// Overwriting a lineage that was revoked meanwhile fails with
    /// [`StoreError::NotFound`]; it is never recreated.
    async fn save(&self, registration: UncommittedRegistration) -> StoreResult<TokenRegistration>;

    /// Delete every registration of the user; returns how many were removed.
    async fn revoke_by_user_id(&self, user_id: UserId) -> StoreResult<u64>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<Account>>;

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<Account>>;

    /// Create an active account. A taken login is [`StoreError::Conflict`].
    async fn create(&self, account: NewAccount) -> StoreResult<Account>;

    /// Returns `false` when the account does not exist.
    async fn set_status(&self, user_id: UserId, status: AccountStatus) -> StoreResult<bool>;
}
