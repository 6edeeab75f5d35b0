//! Token signing and verification.
//!
//! The issuer only sees the [`TokenCodec`] trait; [`Hs256TokenCodec`] is the
//! production implementation (HMAC-SHA256 JWTs via `jsonwebtoken`).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use warden_core::{RegistrationId, UserId};

use crate::{AccessClaims, PermissionSet, RefreshClaims, TokenKind};

/// Failure to turn a token string back into claims.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Malformed, bad signature, wrong issuer or expired.
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// A well-formed token of the other kind (access presented as refresh, or vice versa).
    #[error("unexpected token kind: expected {expected:?}, got {actual:?}")]
    WrongKind { expected: TokenKind, actual: TokenKind },
}

#[derive(Debug, Error)]
#[error("failed to sign token: {0}")]
pub struct EncodeError(#[from] jsonwebtoken::errors::Error);

/// Signs and parses access/refresh tokens.
pub trait TokenCodec: Send + Sync {
    fn encode_access(
        &self,
        user_id: UserId,
        issued_at: DateTime<Utc>,
        permissions: &PermissionSet,
        expires_at: DateTime<Utc>,
    ) -> Result<String, EncodeError>;

    fn encode_refresh(
        &self,
        registration_id: RegistrationId,
        issued_at: DateTime<Utc>,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, EncodeError>;

    fn decode_access(&self, token: &str) -> Result<AccessClaims, DecodeError>;

    fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, DecodeError>;
}

/// HS256 codec with a shared secret and a fixed issuer.
#[derive(Clone)]
pub struct Hs256TokenCodec {
    issuer: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;
        validation
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, DecodeError> {
        let data = jsonwebtoken::decode::<T>(token, &self.decoding, &self.validation())?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for Hs256TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenCodec")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenCodec for Hs256TokenCodec {
    fn encode_access(
        &self,
        user_id: UserId,
        issued_at: DateTime<Utc>,
        permissions: &PermissionSet,
        expires_at: DateTime<Utc>,
    ) -> Result<String, EncodeError> {
        let claims = AccessClaims {
            user_id,
            typ: TokenKind::Access,
            iss: self.issuer.clone(),
            issued_at,
            expires_at,
            permissions: permissions.clone(),
        };
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    fn encode_refresh(
        &self,
        registration_id: RegistrationId,
        issued_at: DateTime<Utc>,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, EncodeError> {
        let claims = RefreshClaims {
            user_id,
            typ: TokenKind::Refresh,
            iss: self.issuer.clone(),
            registration_id,
            jti: Uuid::now_v7(),
            issued_at,
            expires_at,
        };
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    fn decode_access(&self, token: &str) -> Result<AccessClaims, DecodeError> {
        let claims: AccessClaims = self.decode(token)?;
        if claims.typ != TokenKind::Access {
            return Err(DecodeError::WrongKind {
                expected: TokenKind::Access,
                actual: claims.typ,
            });
        }
        Ok(claims)
    }

    fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, DecodeError> {
        // Access tokens lack `rid`/`jti` and fail to deserialize before the kind
        // check; read `typ` alone first so the error names the real problem.
        let kind: KindOnly = self.decode(token)?;
        if kind.typ != TokenKind::Refresh {
            return Err(DecodeError::WrongKind {
                expected: TokenKind::Refresh,
                actual: kind.typ,
            });
        }
        self.decode(token)
    }
}

#[derive(serde::Deserialize)]
struct KindOnly {
    typ: TokenKind,
}
