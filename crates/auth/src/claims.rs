use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use warden_core::{RegistrationId, UserId};

use crate::PermissionSet;

/// Discriminates access tokens from refresh tokens (`typ` claim).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Access token claims: a signed snapshot of the user's permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user the token was minted for.
    #[serde(rename = "sub", with = "string_id")]
    pub user_id: UserId,

    pub typ: TokenKind,

    pub iss: String,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Permission names granted at mint time.
    pub permissions: PermissionSet,
}

/// Refresh token claims, bound to a token registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "sub", with = "string_id")]
    pub user_id: UserId,

    pub typ: TokenKind,

    pub iss: String,

    /// Registration (lineage) the refresh token belongs to.
    #[serde(rename = "rid")]
    pub registration_id: RegistrationId,

    /// Unique per issuance; two refresh tokens are never byte-identical.
    pub jti: Uuid,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a token's time window against `now`.
///
/// Signature verification happens in the codec; this only looks at the
/// timestamps so callers can evaluate tokens against an explicit clock.
pub fn validate_claims(
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if expires_at <= issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

impl AccessClaims {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
        validate_claims(self.issued_at, self.expires_at, now)
    }
}

impl RefreshClaims {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
        validate_claims(self.issued_at, self.expires_at, now)
    }
}

/// `sub` is a JWT string claim; user ids are integers.
mod string_id {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use warden_core::UserId;

    pub fn serialize<S: Serializer>(id: &UserId, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<UserId, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::Permission;

    #[test]
    fn time_window_checks() {
        let now = Utc::now();
        assert_eq!(validate_claims(now, now + Duration::minutes(5), now), Ok(()));
        assert_eq!(
            validate_claims(now - Duration::minutes(10), now - Duration::minutes(5), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(now + Duration::minutes(1), now + Duration::minutes(5), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(now, now, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn access_claims_use_registered_claim_names() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let claims = AccessClaims {
            user_id: UserId::new(12),
            typ: TokenKind::Access,
            iss: "warden".to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(900),
            permissions: [Permission::new("read")].into_iter().collect(),
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "12");
        assert_eq!(json["typ"], "access");
        assert_eq!(json["iat"], 1_700_000_000);
        assert_eq!(json["exp"], 1_700_000_900);
        assert_eq!(json["permissions"], serde_json::json!(["read"]));

        let back: AccessClaims = serde_json::from_value(json).unwrap();
        assert_eq!(back, claims);
    }
}
