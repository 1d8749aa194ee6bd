//! Caller-facing error model.

use thiserror::Error;

/// Result type used by the ledger engine and identity service.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing error taxonomy.
///
/// Lower layers (ledger arithmetic, token validation, stores) keep their own
/// error enums and convert into this one at the service boundary. Messages on
/// `Internal` are for logs only; transports must not echo them to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed or missing input fields.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Account or credential absent.
    #[error("not found")]
    NotFound,

    /// Duplicate username at signup.
    #[error("already exists")]
    AlreadyExists,

    /// Bad credentials or an invalid/expired token.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Source balance is lower than the requested amount.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Amount is not a positive value (or would overflow a balance).
    #[error("invalid amount")]
    InvalidAmount,

    /// Transfer target is not acceptable (e.g. the source account itself).
    #[error("invalid target")]
    InvalidTarget,

    /// The store did not answer within the bounded duration; nothing was committed.
    #[error("temporarily unavailable: {0}")]
    Unavailable(String),

    /// Store or unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code for transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::Unauthenticated => "unauthenticated",
            Self::InsufficientFunds => "insufficient_funds",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidTarget => "invalid_target",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether a retry of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let all = [
            ServiceError::invalid_input("x"),
            ServiceError::NotFound,
            ServiceError::AlreadyExists,
            ServiceError::Unauthenticated,
            ServiceError::InsufficientFunds,
            ServiceError::InvalidAmount,
            ServiceError::InvalidTarget,
            ServiceError::unavailable("x"),
            ServiceError::internal("x"),
        ];
        let mut codes: Vec<_> = all.iter().map(ServiceError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn only_unavailable_is_transient() {
        assert!(ServiceError::unavailable("timeout").is_transient());
        assert!(!ServiceError::internal("boom").is_transient());
        assert!(!ServiceError::InsufficientFunds.is_transient());
    }
}
