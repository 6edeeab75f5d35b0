//! Login and refresh. Both return a token pair plus the account profile.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::{error, warn};

use warden_auth::verify_password;

use crate::app::dto::{LoginRequest, ProfileResponse, RefreshRequest, TokenResponse};
use crate::app::{errors, services::AppServices};

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let account = match services.accounts.find_by_login(&body.login).await {
        Ok(Some(account)) => account,
        Ok(None) => return errors::invalid_credentials(),
        Err(e) => return errors::store_error_to_response(e),
    };

    // argon2 is deliberately slow; keep it off the async workers.
    let hash = account.password_hash.clone();
    let verified =
        tokio::task::spawn_blocking(move || verify_password(&body.password, &hash)).await;

    match verified {
        Ok(Ok(true)) => {}
        Ok(Ok(false)) => return errors::invalid_credentials(),
        Ok(Err(e)) => {
            warn!(user_id = %account.id, error = %e, "stored password hash is unusable");
            return errors::invalid_credentials();
        }
        Err(e) => {
            error!(error = %e, "password verification task failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            );
        }
    }

    if account.is_locked() {
        return errors::json_error(StatusCode::FORBIDDEN, "account_locked", "account is locked");
    }

    match services.issuer.issue_or_reuse(account.id, Utc::now()).await {
        Ok(tokens) => (
            StatusCode::OK,
            Json(TokenResponse::new(tokens, ProfileResponse::from(&account))),
        )
            .into_response(),
        Err(e) => errors::issue_error_to_response(e),
    }
}

/// POST /auth/refresh
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RefreshRequest>,
) -> axum::response::Response {
    match services.issuer.refresh(&body.refresh_token, Utc::now()).await {
        Ok(refreshed) => (
            StatusCode::OK,
            Json(TokenResponse::new(
                refreshed.tokens,
                ProfileResponse::from(&refreshed.account),
            )),
        )
            .into_response(),
        Err(e) => errors::issue_error_to_response(e),
    }
}
