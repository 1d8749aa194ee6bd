use serde::{Deserialize, Serialize};

use tally_core::AccountId;

use crate::{Account, Amount, LedgerError};

/// Request-scoped transfer: move `amount` from `source` to `target`.
///
/// Construction enforces the cheap preconditions (positive amount, distinct
/// accounts); the funds check needs the locked balance and happens in
/// [`apply_transfer`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    source: AccountId,
    target: AccountId,
    amount: Amount,
}

impl TransferIntent {
    pub fn new(source: AccountId, target: AccountId, amount: i64) -> Result<Self, LedgerError> {
        let amount = Amount::new(amount)?;
        if source == target {
            return Err(LedgerError::InvalidTarget);
        }
        Ok(Self {
            source,
            target,
            amount,
        })
    }

    pub fn source(&self) -> AccountId {
        self.source
    }

    pub fn target(&self) -> AccountId {
        self.target
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Both account ids in global lock order (ascending).
    pub fn lock_order(&self) -> [AccountId; 2] {
        if self.source < self.target {
            [self.source, self.target]
        } else {
            [self.target, self.source]
        }
    }
}

/// Result of a committed transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub amount: i64,
    pub source_balance: i64,
    pub target_balance: i64,
}

/// Debit `source` and credit `target` as one step.
///
/// Both new balances are computed before either account is written, so on
/// any error neither account is modified.
pub fn apply_transfer(
    intent: &TransferIntent,
    source: &mut Account,
    target: &mut Account,
) -> Result<TransferOutcome, LedgerError> {
    debug_assert_eq!(source.account_id, intent.source);
    debug_assert_eq!(target.account_id, intent.target);

    let source_balance = source.debited(intent.amount)?;
    let target_balance = target.credited(intent.amount)?;

    source.balance = source_balance;
    target.balance = target_balance;

    Ok(TransferOutcome {
        amount: intent.amount.get(),
        source_balance,
        target_balance,
    })
}
