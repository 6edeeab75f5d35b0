//! Store selection and issuer wiring.

use std::sync::Arc;

use tracing::{info, warn};

use warden_auth::{
    AccountStore, Hs256TokenCodec, Permission, PermissionStore, TokenCodec,
    TokenIssuer, TokenLifetimes, TokenRegistrationStore, hash_password,
};
use warden_infra::{
    Config, InMemoryAccountStore, InMemoryPermissionStore, InMemoryTokenRegistrationStore,
    PgStores,
};

/// Shared handles used by the handlers.
#[derive(Clone)]
pub struct AppServices {
    pub issuer: Arc<TokenIssuer>,
    pub codec: Arc<dyn TokenCodec>,
    pub accounts: Arc<dyn AccountStore>,
    pub registrations: Arc<dyn TokenRegistrationStore>,
}

/// Concrete in-memory stores, kept so callers can seed and mutate them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStores {
    pub permissions: Arc<InMemoryPermissionStore>,
    pub registrations: Arc<InMemoryTokenRegistrationStore>,
    pub accounts: Arc<InMemoryAccountStore>,
}

impl AppServices {
    pub fn new(
        permissions: Arc<dyn PermissionStore>,
        registrations: Arc<dyn TokenRegistrationStore>,
        accounts: Arc<dyn AccountStore>,
        codec: Arc<dyn TokenCodec>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(
            permissions,
            registrations.clone(),
            accounts.clone(),
            codec.clone(),
            lifetimes,
        ));
        Self {
            issuer,
            codec,
            accounts,
            registrations,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(config: &Config) -> (Self, MemoryStores) {
        let stores = MemoryStores::default();
        let services = Self::new(
            stores.permissions.clone(),
            stores.registrations.clone(),
            stores.accounts.clone(),
            codec(config),
            config.lifetimes(),
        );
        (services, stores)
    }

    /// Postgres when `DATABASE_URL` is set, otherwise seeded in-memory stores.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                let pg = Arc::new(PgStores::connect(url, config.database_max_connections).await?);
                Ok(Self::new(
                    pg.clone(),
                    pg.clone(),
                    pg,
                    codec(config),
                    config.lifetimes(),
                ))
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory stores");
                let (services, stores) = Self::in_memory(config);
                seed_dev_admin(&stores, &dev_admin_password())?;
                Ok(services)
            }
        }
    }
}

fn codec(config: &Config) -> Arc<dyn TokenCodec> {
    Arc::new(Hs256TokenCodec::new(
        config.jwt_secret.as_bytes(),
        config.jwt_issuer.clone(),
    ))
}

fn dev_admin_password() -> String {
    std::env::var("WARDEN_DEV_ADMIN_PASSWORD").unwrap_or_else(|_| "admin-password".to_string())
}

/// Create an `admin` account holding the wildcard permission.
pub fn seed_dev_admin(stores: &MemoryStores, password: &str) -> anyhow::Result<()> {
    let hash = hash_password(password)?;
    let admin = stores.accounts.insert_account("admin", "Administrator", hash)?;
    stores
        .permissions
        .set_permissions(admin.id, [Permission::new("*")])?;
    info!(user_id = %admin.id, "seeded dev admin account");
    Ok(())
}

