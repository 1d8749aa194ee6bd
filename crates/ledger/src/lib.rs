//! Ledger module (per-account balances, top-up and transfer arithmetic).
//!
//! Pure domain logic only: no IO, no locking, no persistence concerns. Stores
//! call into this crate while they hold the row locks of an atomic unit.

pub mod account;
pub mod amount;
pub mod error;
pub mod transfer;

pub use account::Account;
pub use amount::Amount;
pub use error::LedgerError;
pub use transfer::{apply_transfer, TransferIntent, TransferOutcome};
