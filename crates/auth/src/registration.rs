use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{RegistrationId, UserId};

/// A token registration ready to be persisted.
///
/// `id` is `None` for a brand-new lineage (the store assigns one) and `Some`
/// when re-saving a stale lineage with a freshly minted access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedRegistration {
    pub id: Option<RegistrationId>,
    pub user_id: UserId,
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
}

/// A persisted token registration: links a refresh-token lineage to the
/// most recently issued access token of its user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRegistration {
    pub id: RegistrationId,
    pub user_id: UserId,
    /// Currently valid encoded access token; empty until minted.
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    /// `None` means the token's own `exp` claim is authoritative.
    pub expired_at: Option<DateTime<Utc>>,
}

impl TokenRegistration {
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expired_at.is_some_and(|at| at < now)
    }
}

impl UncommittedRegistration {
    /// Attach the store-assigned id.
    pub fn commit(self, id: RegistrationId) -> TokenRegistration {
        TokenRegistration {
            id,
            user_id: self.user_id,
            access_token: self.access_token,
            issued_at: self.issued_at,
            expired_at: self.expired_at,
        }
    }
}
