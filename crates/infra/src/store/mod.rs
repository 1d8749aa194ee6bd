//! Storage ports for credentials and balances.
//!
//! Each mutating method is one atomic unit: it either commits completely or
//! leaves the store exactly as it was. Implementations are responsible for
//! row locking; the ledger rules themselves live in `tally-ledger`.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use tally_auth::{Credential, NewCredential};
use tally_core::{AccountId, ServiceError};
use tally_ledger::{Account, Amount, LedgerError, TransferIntent, TransferOutcome};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Store operation error.
///
/// These are infrastructure outcomes (missing rows, uniqueness, backend
/// failures) plus ledger rule failures raised while the unit held its locks.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The store's own balance constraint rejected a write.
    #[error("balance constraint violated: {0}")]
    BalanceConstraint(String),

    /// Transient: lock/statement timeout, pool exhaustion, deadlock victim.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::AlreadyExists => ServiceError::AlreadyExists,
            StoreError::Ledger(e) => e.into(),
            StoreError::BalanceConstraint(_) => ServiceError::InsufficientFunds,
            StoreError::Unavailable(msg) => ServiceError::Unavailable(msg),
            StoreError::Backend(msg) => ServiceError::Internal(msg),
        }
    }
}

/// Credential persistence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError>;

    /// Signup unit: insert the credential and open its zero-balance account
    /// (`account_id == auth_id`) together.
    ///
    /// Fails with `AlreadyExists` if the username is taken, including when a
    /// concurrent signup wins the race.
    async fn create_with_account(&self, new: NewCredential) -> Result<Credential, StoreError>;
}

/// Balance persistence. Every read goes to the authoritative store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Top-up unit: lock the row, credit, write back.
    async fn top_up(&self, account_id: AccountId, amount: Amount) -> Result<Account, StoreError>;

    /// Transfer unit: lock both rows in ascending id order, re-read the
    /// source balance under the lock, debit and credit, write both.
    async fn transfer(&self, intent: TransferIntent) -> Result<TransferOutcome, StoreError>;
}

#[async_trait]
impl<S> CredentialStore for Arc<S>
where
    S: CredentialStore + ?Sized,
{
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        (**self).find_by_username(username).await
    }

    async fn create_with_account(&self, new: NewCredential) -> Result<Credential, StoreError> {
        (**self).create_with_account(new).await
    }
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn load_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).load_account(account_id).await
    }

    async fn top_up(&self, account_id: AccountId, amount: Amount) -> Result<Account, StoreError> {
        (**self).top_up(account_id, amount).await
    }

    async fn transfer(&self, intent: TransferIntent) -> Result<TransferOutcome, StoreError> {
        (**self).transfer(intent).await
    }
}
