use thiserror::Error;

use tally_core::ServiceError;

/// Deterministic ledger rule failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be positive (got {0})")]
    InvalidAmount(i64),

    #[error("source and target account must differ")]
    InvalidTarget,

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("balance arithmetic overflow")]
    Overflow,
}

impl From<LedgerError> for ServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::InvalidAmount(_) | LedgerError::Overflow => ServiceError::InvalidAmount,
            LedgerError::InvalidTarget => ServiceError::InvalidTarget,
            LedgerError::InsufficientFunds { .. } => ServiceError::InsufficientFunds,
        }
    }
}
