//! `warden-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: stores are
//! traits, and the token codec is a trait with one HS256 implementation.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod codec;
pub mod issuer;
pub mod password;
pub mod permissions;
pub mod registration;
pub mod store;

pub use account::{Account, AccountStatus, NewAccount, lock_account};
pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{AccessClaims, RefreshClaims, TokenKind, TokenValidationError, validate_claims};
pub use codec::{DecodeError, EncodeError, Hs256TokenCodec, TokenCodec};
pub use issuer::{IssueError, IssuedTokens, Refreshed, StaleReason, TokenIssuer, TokenLifetimes};
pub use password::{MIN_PASSWORD_LEN, PasswordError, hash_password, verify_password};
pub use permissions::{Permission, PermissionSet, sets_equal};
pub use registration::{TokenRegistration, UncommittedRegistration};
pub use store::{AccountStore, PermissionStore, StoreError, StoreResult, TokenRegistrationStore};
