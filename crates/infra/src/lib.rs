//! Infrastructure layer: store implementations and configuration.

pub mod config;
pub mod memory;
pub mod postgres;

pub use config::{Config, ConfigError};
pub use memory::{InMemoryAccountStore, InMemoryPermissionStore, InMemoryTokenRegistrationStore};
pub use postgres::PgStores;
