//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | PoolClosed / PoolTimedOut / Io | `Unavailable` |
//! | Database (unique violation, `23505`) on account insert | `Conflict` |
//! | anything else | `Unexpected` |
//!
//! An UPDATE of a registration that matched no row is `NotFound`: the lineage
//! was revoked between read and write.
//!
//! Permissions are resolved through roles:
//! `account_roles -> role_permissions -> permissions`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::{info, instrument};

use warden_auth::{
    Account, AccountStatus, AccountStore, NewAccount, Permission, PermissionStore, StoreError, StoreResult,
    TokenRegistration, TokenRegistrationStore, UncommittedRegistration,
};
use warden_core::{RegistrationId, UserId};

/// All three stores over one connection pool.
#[derive(Debug, Clone)]
pub struct PgStores {
    pool: Arc<PgPool>,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unexpected(anyhow::anyhow!("migrations failed: {e}")))?;

        info!(max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl PermissionStore for PgStores {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn get_by_user_id(&self, user_id: UserId) -> StoreResult<Vec<Permission>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT p.name
            FROM account_roles ar
            JOIN role_permissions rp ON rp.role_id = ar.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE ar.account_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(user_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_permissions", e))?;

        Ok(names.into_iter().map(Permission::new).collect())
    }
}

#[async_trait]
impl TokenRegistrationStore for PgStores {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_last_by_user_id(&self, user_id: UserId) -> StoreResult<Option<TokenRegistration>> {
        let row: Option<RegistrationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, access_token, issued_at, expired_at
            FROM token_registrations
            WHERE user_id = $1
            ORDER BY issued_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_last_registration", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self), fields(registration_id = %id), err)]
    async fn find_by_id(&self, id: RegistrationId) -> StoreResult<Option<TokenRegistration>> {
        let row: Option<RegistrationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, access_token, issued_at, expired_at
            FROM token_registrations
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_registration", e))?;

        Ok(row.map(Into::into))
    }

    // Single statement either way, so a reader never observes a half-written row.
    #[instrument(skip(self, registration), fields(user_id = %registration.user_id), err)]
    async fn save(&self, registration: UncommittedRegistration) -> StoreResult<TokenRegistration> {
        let row: Option<RegistrationRow> = match registration.id {
            None => sqlx::query_as(
                r#"
                INSERT INTO token_registrations (user_id, access_token, issued_at, expired_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, access_token, issued_at, expired_at
                "#,
            )
            .bind(registration.user_id.get())
            .bind(&registration.access_token)
            .bind(registration.issued_at)
            .bind(registration.expired_at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_registration", e))?,

            Some(id) => sqlx::query_as(
                r#"
                UPDATE token_registrations
                SET access_token = $3, issued_at = $4, expired_at = $5
                WHERE id = $1 AND user_id = $2
                RETURNING id, user_id, access_token, issued_at, expired_at
                "#,
            )
            .bind(id.get())
            .bind(registration.user_id.get())
            .bind(&registration.access_token)
            .bind(registration.issued_at)
            .bind(registration.expired_at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_registration", e))?,
        };

        row.map(Into::into).ok_or_else(|| match registration.id {
            Some(id) => StoreError::NotFound(format!("token registration {id} no longer exists")),
            None => StoreError::Unexpected(anyhow::anyhow!("insert returned no row")),
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn revoke_by_user_id(&self, user_id: UserId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM token_registrations WHERE user_id = $1")
            .bind(user_id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_registrations", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AccountStore for PgStores {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, login, display_name, password_hash, status FROM accounts WHERE id = $1",
        )
        .bind(user_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_account", e))?;

        row.map(AccountRow::into_account).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, login, display_name, password_hash, status FROM accounts WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_account_by_login", e))?;

        row.map(AccountRow::into_account).transpose()
    }

    #[instrument(skip(self, account), fields(login = %account.login), err)]
    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let row: AccountRow = sqlx::query_as(
            r#"
            INSERT INTO accounts (login, display_name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, login, display_name, password_hash, status
            "#,
        )
        .bind(&account.login)
        .bind(&account.display_name)
        .bind(&account.password_hash)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("login '{}' already taken", account.login))
            } else {
                map_sqlx_error("create_account", e)
            }
        })?;

        row.into_account()
    }

    #[instrument(skip(self), fields(user_id = %user_id, status = %status), err)]
    async fn set_status(&self, user_id: UserId, status: AccountStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE accounts SET status = $2 WHERE id = $1")
            .bind(user_id.get())
            .bind(status.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_account_status", e))?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        other => StoreError::Unexpected(anyhow::Error::new(other).context(operation.to_string())),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// SQLx row types

#[derive(Debug)]
struct RegistrationRow {
    id: i64,
    user_id: i64,
    access_token: String,
    issued_at: DateTime<Utc>,
    expired_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for RegistrationRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RegistrationRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            access_token: row.try_get("access_token")?,
            issued_at: row.try_get("issued_at")?,
            expired_at: row.try_get("expired_at")?,
        })
    }
}

impl From<RegistrationRow> for TokenRegistration {
    fn from(row: RegistrationRow) -> Self {
        TokenRegistration {
            id: RegistrationId::new(row.id),
            user_id: UserId::new(row.user_id),
            access_token: row.access_token,
            issued_at: row.issued_at,
            expired_at: row.expired_at,
        }
    }
}

#[derive(Debug)]
struct AccountRow {
    id: i64,
    login: String,
    display_name: String,
    password_hash: String,
    status: String,
}

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
            display_name: row.try_get("display_name")?,
            password_hash: row.try_get("password_hash")?,
            status: row.try_get("status")?,
        })
    }
}

impl AccountRow {
    fn into_account(self) -> StoreResult<Account> {
        let status = self
            .status
            .parse()
            .map_err(|e| StoreError::Unexpected(anyhow::anyhow!("account {}: {e}", self.id)))?;
        Ok(Account {
            id: UserId::new(self.id),
            login: self.login,
            display_name: self.display_name,
            password_hash: self.password_hash,
            status,
        })
    }
}
