use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::app::dto;
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/validate", post(validate))
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::SignupRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .identity
        .signup(&body.username, &body.password, &body.name)
        .await
    {
        Ok(account_id) => (
            StatusCode::CREATED,
            Json(dto::SignupResponse {
                account_id: account_id.get(),
            }),
        )
            .into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.identity.login(&body.username, &body.password).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(dto::LoginResponse {
                message: format!("{} login success", outcome.username),
                token: outcome.token,
            }),
        )
            .into_response(),
        Err(e) => service_error_to_response(e),
    }
}

/// Resolve a token to its identity (used by other services).
pub async fn validate(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::ValidateRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.identity.validate(body.token.trim()) {
        Ok(principal) => (
            StatusCode::OK,
            Json(dto::ValidateResponse {
                auth_id: principal.auth_id.get(),
                account_id: principal.account_id.get(),
                username: principal.username,
            }),
        )
            .into_response(),
        Err(e) => service_error_to_response(e),
    }
}
