use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tally_core::ServiceError;

/// Map a service error onto the HTTP status table. Internal details are
/// logged here and never returned to the caller.
pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let code = err.code();
    match err {
        ServiceError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, code, msg),
        ServiceError::InvalidAmount => {
            json_error(StatusCode::BAD_REQUEST, code, "amount must be greater than zero")
        }
        ServiceError::InvalidTarget => {
            json_error(StatusCode::BAD_REQUEST, code, "cannot transfer to the same account")
        }
        ServiceError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, code, "invalid credentials")
        }
        ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, code, "account not found"),
        ServiceError::InsufficientFunds => {
            json_error(StatusCode::NOT_ACCEPTABLE, code, "balance not enough")
        }
        ServiceError::AlreadyExists => {
            json_error(StatusCode::CONFLICT, code, "username already exists")
        }
        ServiceError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "service unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, code, "temporarily unavailable, retry")
        }
        ServiceError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, code, "internal error")
        }
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table() {
        let cases = [
            (ServiceError::invalid_input("x"), StatusCode::BAD_REQUEST),
            (ServiceError::InvalidAmount, StatusCode::BAD_REQUEST),
            (ServiceError::InvalidTarget, StatusCode::BAD_REQUEST),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::NotFound, StatusCode::NOT_FOUND),
            (ServiceError::InsufficientFunds, StatusCode::NOT_ACCEPTABLE),
            (ServiceError::AlreadyExists, StatusCode::CONFLICT),
            (ServiceError::unavailable("slow"), StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
