use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::dto::WhoamiResponse;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(WhoamiResponse {
        user_id: principal.user_id(),
        permissions: principal
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
    })
}
