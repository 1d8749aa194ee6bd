//! Balance operations: top-up, transfer, reads.
//!
//! Validation that needs no store (amount sign, self-transfer) happens here;
//! existence and funds are checked inside the store's atomic unit, against
//! the locked rows.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use tally_core::{AccountId, ServiceError, ServiceResult};
use tally_ledger::{Account, Amount, TransferIntent, TransferOutcome};

use crate::bounded;
use crate::store::LedgerStore;

#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn LedgerStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Credit `amount` to `account_id`; returns the new balance.
    #[instrument(skip(self), fields(account_id = %account_id), err)]
    pub async fn top_up(&self, account_id: AccountId, amount: i64) -> ServiceResult<i64> {
        let amount = Amount::new(amount)?;
        let account = bounded(self.timeout, "top_up", self.store.top_up(account_id, amount)).await?;

        tracing::info!(balance = account.balance, "account topped up");
        Ok(account.balance)
    }

    /// Move `amount` from `source` to `target` atomically.
    ///
    /// Errors, in check order: `InvalidAmount`, `InvalidTarget` (self-transfer),
    /// `NotFound` (either side), `InsufficientFunds` (against the locked
    /// source balance).
    #[instrument(skip(self), fields(source = %source, target = %target), err)]
    pub async fn transfer(
        &self,
        source: AccountId,
        target: AccountId,
        amount: i64,
    ) -> ServiceResult<TransferOutcome> {
        let intent = TransferIntent::new(source, target, amount)?;
        let outcome = bounded(self.timeout, "transfer", self.store.transfer(intent)).await?;

        tracing::info!(
            amount = outcome.amount,
            source_balance = outcome.source_balance,
            target_balance = outcome.target_balance,
            "transfer committed"
        );
        Ok(outcome)
    }

    pub async fn account(&self, account_id: AccountId) -> ServiceResult<Account> {
        bounded(self.timeout, "load_account", self.store.load_account(account_id))
            .await?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn balance(&self, account_id: AccountId) -> ServiceResult<i64> {
        Ok(self.account(account_id).await?.balance)
    }
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
