//! Process configuration, read from environment variables.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

use warden_auth::TokenLifetimes;

const DEV_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} is not a valid socket address: '{value}'")]
    InvalidAddr { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    /// `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("database", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("database_max_connections", &self.database_max_connections)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_SECRET.to_string()
        });

        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::InvalidAddr {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        Ok(Self {
            jwt_secret,
            jwt_issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "warden".to_string()),
            access_ttl_seconds: number(&lookup, "ACCESS_TOKEN_TTL_SECONDS", 900)?,
            refresh_ttl_seconds: number(&lookup, "REFRESH_TOKEN_TTL_SECONDS", 2_592_000)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: number(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            bind_addr,
        })
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: Duration::seconds(self.access_ttl_seconds),
            refresh: Duration::seconds(self.refresh_ttl_seconds),
        }
    }
}

fn number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: core::str::FromStr + PartialOrd + Default,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value > T::default() => Ok(value),
            _ => Err(ConfigError::InvalidNumber { name, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.jwt_secret, DEV_SECRET);
        assert_eq!(cfg.jwt_issuer, "warden");
        assert_eq!(cfg.access_ttl_seconds, 900);
        assert_eq!(cfg.refresh_ttl_seconds, 2_592_000);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.lifetimes().access, Duration::minutes(15));
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("JWT_SECRET", "s3cret"),
            ("ACCESS_TOKEN_TTL_SECONDS", "60"),
            ("DATABASE_URL", "postgres://localhost/warden"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ])
        .unwrap();
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.access_ttl_seconds, 60);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/warden"));
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn rejects_bad_numbers() {
        assert_eq!(
            config(&[("ACCESS_TOKEN_TTL_SECONDS", "soon")]).unwrap_err(),
            ConfigError::InvalidNumber {
                name: "ACCESS_TOKEN_TTL_SECONDS",
                value: "soon".to_string()
            }
        );
        assert!(config(&[("REFRESH_TOKEN_TTL_SECONDS", "0")]).is_err());
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn debug_hides_secrets() {
        let cfg = config(&[("JWT_SECRET", "hunter22"), ("DATABASE_URL", "postgres://u:p@h/db")]).unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("hunter22"));
        assert!(!shown.contains("u:p@h"));
    }
}
