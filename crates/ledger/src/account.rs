use serde::{Deserialize, Serialize};

use tally_core::AccountId;

use crate::{Amount, LedgerError};

/// Balance-carrying account.
///
/// # Invariants
/// - `balance >= 0` after every successful mutation.
/// - `account_id` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub name: String,
    pub balance: i64,
}

impl Account {
    /// A freshly opened account (zero balance).
    pub fn open(account_id: AccountId, name: impl Into<String>) -> Self {
        Self {
            account_id,
            name: name.into(),
            balance: 0,
        }
    }

    /// Balance after crediting `amount`, without mutating.
    pub fn credited(&self, amount: Amount) -> Result<i64, LedgerError> {
        self.balance
            .checked_add(amount.get())
            .ok_or(LedgerError::Overflow)
    }

    /// Balance after debiting `amount`, without mutating.
    pub fn debited(&self, amount: Amount) -> Result<i64, LedgerError> {
        if self.balance < amount.get() {
            return Err(LedgerError::InsufficientFunds {
                available: self.balance,
                requested: amount.get(),
            });
        }
        Ok(self.balance - amount.get())
    }

    /// Credit in place (top-up). Returns the new balance.
    pub fn credit(&mut self, amount: Amount) -> Result<i64, LedgerError> {
        self.balance = self.credited(amount)?;
        Ok(self.balance)
    }

    /// Debit in place. Leaves the account untouched on failure.
    pub fn debit(&mut self, amount: Amount) -> Result<i64, LedgerError> {
        self.balance = self.debited(amount)?;
        Ok(self.balance)
    }
}
