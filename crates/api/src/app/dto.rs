use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_ledger::{Account, TransferOutcome};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    #[serde(alias = "balance")]
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub target_account_id: i64,
    #[serde(alias = "balance")]
    pub amount: i64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub account_id: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub auth_id: i64,
    pub account_id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub account_id: i64,
    pub name: String,
    pub balance: i64,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id.get(),
            name: account.name,
            balance: account.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MyAccountResponse {
    pub account: AccountView,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub amount: i64,
    pub sender_balance: i64,
    // Field name kept as existing clients read it.
    pub recepient_balance: i64,
}

impl From<TransferOutcome> for TransferResponse {
    fn from(outcome: TransferOutcome) -> Self {
        Self {
            amount: outcome.amount,
            sender_balance: outcome.source_balance,
            recepient_balance: outcome.target_balance,
        }
    }
}

/// Unwrap a JSON body, answering malformed or incomplete bodies with 400.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload.map(|Json(v)| v).map_err(|rejection| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", rejection.body_text())
    })
}
