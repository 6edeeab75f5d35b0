use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, warn};

use warden_auth::{AuthzError, IssueError, StoreError};

pub fn issue_error_to_response(err: IssueError) -> axum::response::Response {
    match err {
        IssueError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        IssueError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        IssueError::Store(e) => store_error_to_response(e),
        IssueError::Encode(e) => {
            error!(error = %e, "failed to sign token");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "failed to issue token",
            )
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match &err {
        StoreError::NotFound(_) | StoreError::Conflict(_) => {
            warn!(error = %err, "store rejected write")
        }
        _ => error!(error = %err, "store failure"),
    }
    match err {
        StoreError::Unavailable(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_unavailable",
            "storage temporarily unavailable",
        ),
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Conflict(reason) => json_error(StatusCode::CONFLICT, "conflict", reason),
        StoreError::Unexpected(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            "internal storage error",
        ),
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn invalid_credentials() -> axum::response::Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        "invalid_credentials",
        "invalid login or password",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
