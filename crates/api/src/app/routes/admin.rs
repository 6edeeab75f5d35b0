//! Account administration.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use tracing::{error, info};

use warden_auth::{AccountStatus, NewAccount, PasswordError, Permission, hash_password};
use warden_core::UserId;

use crate::app::dto::{CreateAccountRequest, LockResponse, ProfileResponse};
use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

pub const CREATE_PERMISSION: &str = "account.create";
pub const LOCK_PERMISSION: &str = "account.lock";

pub fn router() -> Router {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/:id/lock", post(lock_account))
}

/// POST /admin/accounts - create an active account with no permissions
pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateAccountRequest>,
) -> axum::response::Response {
    if let Err(e) = principal.require(&Permission::new(CREATE_PERMISSION)) {
        return errors::authz_error_to_response(e);
    }

    let login = body.login.trim().to_string();
    if login.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_login", "login must not be empty");
    }

    let password = body.password;
    let hashed = tokio::task::spawn_blocking(move || hash_password(&password)).await;
    let password_hash = match hashed {
        Ok(Ok(hash)) => hash,
        Ok(Err(e @ PasswordError::TooShort(_))) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "weak_password", e.to_string());
        }
        Ok(Err(e)) => {
            error!(error = %e, "password hashing failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            );
        }
        Err(e) => {
            error!(error = %e, "password hashing task failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            );
        }
    };

    let created = services
        .accounts
        .create(NewAccount {
            login,
            display_name: body.display_name,
            password_hash,
        })
        .await;

    match created {
        Ok(account) => {
            info!(user_id = %account.id, by = %principal.user_id(), "account created");
            (StatusCode::CREATED, Json(ProfileResponse::from(&account))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /admin/accounts/:id/lock - lock the account and revoke its lineages
pub async fn lock_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = principal.require(&Permission::new(LOCK_PERMISSION)) {
        return errors::authz_error_to_response(e);
    }

    let user_id: UserId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()),
    };

    match warden_auth::lock_account(
        services.accounts.as_ref(),
        services.registrations.as_ref(),
        user_id,
    )
    .await
    {
        Ok(revoked) => Json(LockResponse {
            user_id,
            status: AccountStatus::Locked.as_str(),
            revoked_registrations: revoked,
        })
        .into_response(),
        Err(e) => errors::issue_error_to_response(e),
    }
}
