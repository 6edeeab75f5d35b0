use serde::{Deserialize, Serialize};

use warden_auth::{Account, IssuedTokens};
use warden_core::UserId;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub login: String,
    pub display_name: String,
    pub password: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: UserId,
    pub login: String,
    pub display_name: String,
}

impl From<&Account> for ProfileResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            login: account.login.clone(),
            display_name: account.display_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub profile: ProfileResponse,
}

impl TokenResponse {
    pub fn new(tokens: IssuedTokens, profile: ProfileResponse) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer",
            profile,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub user_id: UserId,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LockResponse {
    pub user_id: UserId,
    pub status: &'static str,
    pub revoked_registrations: u64,
}
