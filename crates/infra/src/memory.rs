//! In-memory stores.
//!
//! Intended for tests/dev. Not optimized for performance.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use warden_auth::{
    Account, AccountStatus, AccountStore, NewAccount, Permission, PermissionStore, StoreError, StoreResult,
    TokenRegistration, TokenRegistrationStore, UncommittedRegistration,
};
use warden_core::{RegistrationId, UserId};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// Direct user-to-permission grants.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    grants: RwLock<HashMap<UserId, BTreeSet<Permission>>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, user_id: UserId, permission: Permission) -> StoreResult<()> {
        let mut grants = self.grants.write().map_err(|_| poisoned())?;
        grants.entry(user_id).or_default().insert(permission);
        Ok(())
    }

    pub fn revoke(&self, user_id: UserId, permission: &Permission) -> StoreResult<()> {
        let mut grants = self.grants.write().map_err(|_| poisoned())?;
        if let Some(set) = grants.get_mut(&user_id) {
            set.remove(permission);
        }
        Ok(())
    }

    /// Replace the user's grants wholesale.
    pub fn set_permissions<I>(&self, user_id: UserId, permissions: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = Permission>,
    {
        let mut grants = self.grants.write().map_err(|_| poisoned())?;
        grants.insert(user_id, permissions.into_iter().collect());
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn get_by_user_id(&self, user_id: UserId) -> StoreResult<Vec<Permission>> {
        let grants = self.grants.read().map_err(|_| poisoned())?;
        Ok(grants
            .get(&user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTokenRegistrationStore {
    rows: RwLock<HashMap<RegistrationId, TokenRegistration>>,
    next_id: AtomicI64,
}

impl InMemoryTokenRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.rows.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl TokenRegistrationStore for InMemoryTokenRegistrationStore {
    async fn find_last_by_user_id(&self, user_id: UserId) -> StoreResult<Option<TokenRegistration>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| (r.issued_at, r.id))
            .cloned())
    }

    async fn find_by_id(&self, id: RegistrationId) -> StoreResult<Option<TokenRegistration>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }

    async fn save(&self, registration: UncommittedRegistration) -> StoreResult<TokenRegistration> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;

        let id = match registration.id {
            Some(id) => {
                // Overwrite only an existing lineage; a revoked one stays gone.
                let existing = rows.get(&id).ok_or_else(|| {
                    StoreError::NotFound(format!("token registration {id} no longer exists"))
                })?;
                if existing.user_id != registration.user_id {
                    return Err(StoreError::Unexpected(anyhow::anyhow!(
                        "token registration {id} belongs to another user"
                    )));
                }
                id
            }
            None => RegistrationId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
        };

        let saved = registration.commit(id);
        rows.insert(id, saved.clone());
        Ok(saved)
    }

    async fn revoke_by_user_id(&self, user_id: UserId) -> StoreResult<u64> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let before = rows.len();
        rows.retain(|_, r| r.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<UserId, Account>>,
    next_id: AtomicI64,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account, assigning the next id. Fails on duplicate login.
    pub fn insert_account(
        &self,
        login: impl Into<String>,
        display_name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> StoreResult<Account> {
        let login = login.into();
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        if accounts.values().any(|a| a.login == login) {
            return Err(StoreError::Conflict(format!("login '{login}' already taken")));
        }

        let account = Account {
            id: UserId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            login,
            display_name: display_name.into(),
            password_hash: password_hash.into(),
            status: AccountStatus::Active,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts.get(&user_id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts.values().find(|a| a.login == login).cloned())
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        self.insert_account(account.login, account.display_name, account.password_hash)
    }

    async fn set_status(&self, user_id: UserId, status: AccountStatus) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        match accounts.get_mut(&user_id) {
            Some(account) => {
                account.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn uncommitted(user_id: UserId, token: &str, id: Option<RegistrationId>) -> UncommittedRegistration {
        let now = Utc::now();
        UncommittedRegistration {
            id,
            user_id,
            access_token: token.to_string(),
            issued_at: now,
            expired_at: Some(now + Duration::minutes(15)),
        }
    }

    #[tokio::test]
    async fn permissions_are_deduplicated_and_replaceable() {
        let store = InMemoryPermissionStore::new();
        let user = UserId::new(1);
        store.grant(user, Permission::new("read")).unwrap();
        store.grant(user, Permission::new("read")).unwrap();
        store.grant(user, Permission::new("write")).unwrap();
        assert_eq!(store.get_by_user_id(user).await.unwrap().len(), 2);

        store.revoke(user, &Permission::new("write")).unwrap();
        assert_eq!(
            store.get_by_user_id(user).await.unwrap(),
            vec![Permission::new("read")]
        );

        store.set_permissions(user, Vec::new()).unwrap();
        assert!(store.get_by_user_id(user).await.unwrap().is_empty());
        assert!(store.get_by_user_id(UserId::new(99)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_inserts_then_overwrites_in_place() {
        let store = InMemoryTokenRegistrationStore::new();
        let user = UserId::new(7);

        let first = store.save(uncommitted(user, "a", None)).await.unwrap();
        let second = store.save(uncommitted(user, "b", Some(first.id))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.len().unwrap(), 1);
        let last = store.find_last_by_user_id(user).await.unwrap().unwrap();
        assert_eq!(last.access_token, "b");
    }

    #[tokio::test]
    async fn ids_are_unique_across_users() {
        let store = InMemoryTokenRegistrationStore::new();
        let a = store.save(uncommitted(UserId::new(1), "a", None)).await.unwrap();
        let b = store.save(uncommitted(UserId::new(2), "b", None)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(
            store.find_last_by_user_id(UserId::new(2)).await.unwrap().unwrap().id,
            b.id
        );
    }

    #[tokio::test]
    async fn revoked_lineage_cannot_be_resaved() {
        let store = InMemoryTokenRegistrationStore::new();
        let user = UserId::new(3);
        let reg = store.save(uncommitted(user, "a", None)).await.unwrap();

        assert_eq!(store.revoke_by_user_id(user).await.unwrap(), 1);
        assert!(store.is_empty().unwrap());
        assert!(store.find_by_id(reg.id).await.unwrap().is_none());
        assert!(matches!(
            store.save(uncommitted(user, "b", Some(reg.id))).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn accounts_by_login_and_status() {
        let store = InMemoryAccountStore::new();
        let alice = store
            .create(NewAccount {
                login: "alice".to_string(),
                display_name: "Alice".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            store.insert_account("alice", "Other", "hash"),
            Err(StoreError::Conflict(_))
        ));
        let bob = store.insert_account("bob", "Bob", "hash").unwrap();
        assert_ne!(bob.id, alice.id);

        let found = store.find_by_login("alice").await.unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert!(!found.is_locked());

        assert!(store.set_status(alice.id, AccountStatus::Locked).await.unwrap());
        assert!(store.find_by_id(alice.id).await.unwrap().unwrap().is_locked());
        assert!(!store.set_status(UserId::new(404), AccountStatus::Locked).await.unwrap());
    }
}
