use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use tally_core::{AccountId, ServiceError};

use crate::app::dto;
use crate::app::errors::service_error_to_response;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/my", get(my_account))
        .route("/balance", get(my_balance))
        .route("/transfer", post(transfer))
        .route("/:account_id/topup", post(top_up))
}

pub async fn my_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.ledger.account(principal.account_id()).await {
        Ok(account) => (
            StatusCode::OK,
            Json(dto::MyAccountResponse {
                account: account.into(),
            }),
        )
            .into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn my_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.ledger.balance(principal.account_id()).await {
        Ok(balance) => (StatusCode::OK, Json(dto::BalanceResponse { balance })).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn top_up(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(account_id): Path<String>,
    payload: Result<Json<dto::TopUpRequest>, JsonRejection>,
) -> axum::response::Response {
    let account_id: AccountId = match account_id.parse() {
        Ok(id) => id,
        Err(e) => return service_error_to_response(e),
    };
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    tracing::info!(
        caller = %principal.account_id(),
        account_id = %account_id,
        amount = body.amount,
        "top-up requested"
    );

    match services.ledger.top_up(account_id, body.amount).await {
        Ok(balance) => (StatusCode::OK, Json(dto::BalanceResponse { balance })).into_response(),
        Err(e) => service_error_to_response(e),
    }
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::TransferRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let target = AccountId::new(body.target_account_id);

    match services
        .ledger
        .transfer(principal.account_id(), target, body.amount)
        .await
    {
        Ok(outcome) => {
            (StatusCode::OK, Json(dto::TransferResponse::from(outcome))).into_response()
        }
        Err(ServiceError::InsufficientFunds) => {
            tracing::info!(source = %principal.account_id(), "transfer rejected: insufficient funds");
            service_error_to_response(ServiceError::InsufficientFunds)
        }
        Err(e) => service_error_to_response(e),
    }
}
