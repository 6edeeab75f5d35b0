//! Access/refresh token issuance with access-token reuse.
//!
//! An access token is a signed snapshot of the user's permissions. The most
//! recent registration's access token is handed out again only while it is
//! still valid *and* encodes exactly the user's current permission set;
//! otherwise a new one is minted. Refresh tokens are minted on every call.
//!
//! Lineage states: `Unminted -> Live` on first issuance, `Live -> Stale` when
//! permissions change or the token expires (detected lazily here),
//! `Live|Stale -> Revoked` on `revoke_by_user_id`. A stale lineage keeps its
//! registration id when re-minted; the old token string is discarded.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use warden_core::{RegistrationId, UserId};

use crate::{
    Account, AccountStore, DecodeError, EncodeError, PermissionSet, PermissionStore, StoreError,
    TokenCodec, TokenRegistration, TokenRegistrationStore, UncommittedRegistration, sets_equal,
};

#[derive(Debug, Error)]
pub enum IssueError {
    /// No permissions assigned, or the account is locked.
    #[error("forbidden")]
    Forbidden,

    /// Unknown/revoked registration, missing account, or an undecodable or
    /// expired refresh token.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::days(30),
        }
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub registration_id: RegistrationId,
    pub user_id: UserId,
    /// `true` when the access token was handed out again unchanged.
    pub reused: bool,
}

/// Result of [`TokenIssuer::refresh`]: the new pair plus the account it was
/// issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refreshed {
    pub tokens: IssuedTokens,
    pub account: Account,
}

/// Why a registration's access token cannot be handed out again.
#[derive(Debug)]
pub enum StaleReason {
    /// Registration exists but no access token was ever stored.
    Unminted,
    /// `expired_at` is in the past, or the token's own time window is over.
    Expired,
    /// Malformed, bad signature, or expired per the codec.
    Undecodable(DecodeError),
    /// Token was minted for someone else.
    SubjectMismatch,
    /// The user's permission set changed since the token was minted.
    PermissionsChanged,
}

pub struct TokenIssuer {
    permissions: Arc<dyn PermissionStore>,
    registrations: Arc<dyn TokenRegistrationStore>,
    accounts: Arc<dyn AccountStore>,
    codec: Arc<dyn TokenCodec>,
    lifetimes: TokenLifetimes,
}

impl TokenIssuer {
    pub fn new(
        permissions: Arc<dyn PermissionStore>,
        registrations: Arc<dyn TokenRegistrationStore>,
        accounts: Arc<dyn AccountStore>,
        codec: Arc<dyn TokenCodec>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            permissions,
            registrations,
            accounts,
            codec,
            lifetimes,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Issue tokens for an already-authenticated user.
    ///
    /// Fails with [`IssueError::Forbidden`] when the user holds no permissions,
    /// regardless of any existing registration.
    pub async fn issue_or_reuse(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedTokens, IssueError> {
        let current: PermissionSet = self
            .permissions
            .get_by_user_id(user_id)
            .await?
            .into_iter()
            .collect();

        if current.is_empty() {
            warn!(%user_id, "refusing to issue tokens: no permissions assigned");
            return Err(IssueError::Forbidden);
        }

        let existing = self.registrations.find_last_by_user_id(user_id).await?;

        let (registration, reused) = match existing {
            Some(registration) => match self.check_reusable(&registration, &current, now) {
                Ok(()) => {
                    debug!(%user_id, registration_id = %registration.id, "reusing access token");
                    (registration, true)
                }
                Err(reason) => {
                    debug!(%user_id, registration_id = %registration.id, ?reason, "access token is stale");
                    (self.mint(user_id, &current, Some(registration.id), now).await?, false)
                }
            },
            None => (self.mint(user_id, &current, None, now).await?, false),
        };

        let refresh_token = self.codec.encode_refresh(
            registration.id,
            now,
            user_id,
            now + self.lifetimes.refresh,
        )?;

        Ok(IssuedTokens {
            access_token: registration.access_token,
            refresh_token,
            registration_id: registration.id,
            user_id,
            reused,
        })
    }

    /// Exchange a refresh token for a new pair, re-validating against the
    /// account's *current* permissions.
    ///
    /// The token's time window is checked against `now`, not the wall clock.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Refreshed, IssueError> {
        let claims = self.codec.decode_refresh(refresh_token).map_err(|err| {
            debug!(error = %err, "refresh token rejected");
            IssueError::NotFound
        })?;
        claims.validate(now).map_err(|err| {
            debug!(error = %err, registration_id = %claims.registration_id, "refresh token out of window");
            IssueError::NotFound
        })?;

        let registration = self
            .registrations
            .find_by_id(claims.registration_id)
            .await?
            .ok_or(IssueError::NotFound)?;

        if registration.user_id != claims.user_id {
            warn!(
                registration_id = %registration.id,
                "refresh token subject does not own its registration"
            );
            return Err(IssueError::NotFound);
        }

        let account = self
            .accounts
            .find_by_id(registration.user_id)
            .await?
            .ok_or(IssueError::NotFound)?;

        if account.is_locked() {
            return Err(IssueError::Forbidden);
        }

        let tokens = self.issue_or_reuse(account.id, now).await?;
        Ok(Refreshed { tokens, account })
    }

    /// Decide whether `registration`'s access token may be handed out again.
    ///
    /// Decode failures are downgraded to "not reusable"; a corrupt cached
    /// token never blocks issuing a fresh one.
    pub fn check_reusable(
        &self,
        registration: &TokenRegistration,
        current: &PermissionSet,
        now: DateTime<Utc>,
    ) -> Result<(), StaleReason> {
        if !registration.has_access_token() {
            return Err(StaleReason::Unminted);
        }
        if registration.is_expired(now) {
            return Err(StaleReason::Expired);
        }

        let claims = self
            .codec
            .decode_access(&registration.access_token)
            .map_err(StaleReason::Undecodable)?;

        if claims.validate(now).is_err() {
            return Err(StaleReason::Expired);
        }
        if claims.user_id != registration.user_id {
            return Err(StaleReason::SubjectMismatch);
        }
        if !sets_equal(&claims.permissions, current) {
            return Err(StaleReason::PermissionsChanged);
        }
        Ok(())
    }

    async fn mint(
        &self,
        user_id: UserId,
        permissions: &PermissionSet,
        lineage: Option<RegistrationId>,
        now: DateTime<Utc>,
    ) -> Result<TokenRegistration, IssueError> {
        let expires_at = now + self.lifetimes.access;
        let access_token = self
            .codec
            .encode_access(user_id, now, permissions, expires_at)?;

        let saved = self
            .registrations
            .save(UncommittedRegistration {
                id: lineage,
                user_id,
                access_token,
                issued_at: now,
                expired_at: Some(expires_at),
            })
            .await
            .map_err(|err| match err {
                // Revoked between the reuse check and this write.
                StoreError::NotFound(reason) => {
                    debug!(%user_id, %reason, "lineage vanished before re-mint");
                    IssueError::NotFound
                }
                other => IssueError::Store(other),
            })?;

        info!(
            %user_id,
            registration_id = %saved.id,
            permissions = permissions.len(),
            "minted access token"
        );
        Ok(saved)
    }
}
