use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use tally_auth::{Credential, NewCredential};
use tally_core::{AccountId, AuthId};
use tally_ledger::{apply_transfer, Account, Amount, TransferIntent, TransferOutcome};

use super::{CredentialStore, LedgerStore, StoreError};

type AccountRow = Arc<Mutex<Account>>;

/// In-memory store for tests/dev.
///
/// Each account is its own lock (a "row"); the maps only guard membership.
/// Lock order: `credentials` before `accounts`, and row locks in ascending
/// `account_id`. No row lock is ever held while a map lock is requested.
#[derive(Debug)]
pub struct InMemoryStore {
    credentials: RwLock<HashMap<String, Credential>>,
    accounts: RwLock<BTreeMap<AccountId, AccountRow>>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            credentials: RwLock::new(HashMap::new()),
            accounts: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Open an account without a credential (fixtures, local tooling).
    pub fn seed_account(&self, name: &str, balance: i64) -> Result<AccountId, StoreError> {
        if balance < 0 {
            return Err(StoreError::BalanceConstraint(format!(
                "seed balance {balance} is negative"
            )));
        }
        let account_id = AccountId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut account = Account::open(account_id, name);
        account.balance = balance;

        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        accounts.insert(account_id, Arc::new(Mutex::new(account)));
        Ok(account_id)
    }

    fn row(&self, account_id: AccountId) -> Result<AccountRow, StoreError> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        accounts.get(&account_id).cloned().ok_or(StoreError::NotFound)
    }

    fn create_locked(&self, new: NewCredential) -> Result<Credential, StoreError> {
        let mut credentials = self.credentials.write().map_err(|_| poisoned())?;
        if credentials.contains_key(&new.username) {
            return Err(StoreError::AlreadyExists);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let credential = Credential {
            auth_id: AuthId::new(id),
            account_id: AccountId::new(id),
            username: new.username,
            password_hash: new.password_hash,
        };

        // Account becomes visible before the credential, both under the
        // credentials write lock, so no reader sees one without the other.
        {
            let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
            accounts.insert(
                credential.account_id,
                Arc::new(Mutex::new(Account::open(credential.account_id, new.account_name))),
            );
        }
        credentials.insert(credential.username.clone(), credential.clone());

        Ok(credential)
    }

    fn top_up_locked(&self, account_id: AccountId, amount: Amount) -> Result<Account, StoreError> {
        let row = self.row(account_id)?;
        let mut account = row.lock().map_err(|_| poisoned())?;
        account.credit(amount)?;
        Ok(account.clone())
    }

    fn transfer_locked(&self, intent: TransferIntent) -> Result<TransferOutcome, StoreError> {
        let [first_id, second_id] = intent.lock_order();
        let first = self.row(first_id)?;
        let second = self.row(second_id)?;

        let mut first = first.lock().map_err(|_| poisoned())?;
        let mut second = second.lock().map_err(|_| poisoned())?;

        let outcome = if first.account_id == intent.source() {
            apply_transfer(&intent, &mut first, &mut second)?
        } else {
            apply_transfer(&intent, &mut second, &mut first)?
        };
        Ok(outcome)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        let credentials = self.credentials.read().map_err(|_| poisoned())?;
        Ok(credentials.get(username).cloned())
    }

    async fn create_with_account(&self, new: NewCredential) -> Result<Credential, StoreError> {
        self.create_locked(new)
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn load_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        match self.row(account_id) {
            Ok(row) => {
                let account = row.lock().map_err(|_| poisoned())?;
                Ok(Some(account.clone()))
            }
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn top_up(&self, account_id: AccountId, amount: Amount) -> Result<Account, StoreError> {
        self.top_up_locked(account_id, amount)
    }

    async fn transfer(&self, intent: TransferIntent) -> Result<TransferOutcome, StoreError> {
        self.transfer_locked(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_ledger::LedgerError;

    fn new_credential(username: &str) -> NewCredential {
        NewCredential {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            account_name: username.to_uppercase(),
        }
    }

    #[tokio::test]
    async fn signup_creates_credential_and_account_together() {
        let store = InMemoryStore::new();
        let cred = store.create_with_account(new_credential("alice")).await.unwrap();

        assert_eq!(cred.auth_id.get(), cred.account_id.get());
        let account = store.load_account(cred.account_id).await.unwrap().unwrap();
        assert_eq!(account.balance, 0);
        assert_eq!(account.name, "ALICE");
        assert_eq!(
            store.find_by_username("alice").await.unwrap().unwrap().account_id,
            cred.account_id
        );
    }

    #[tokio::test]
    async fn duplicate_username_leaves_no_orphan_account() {
        let store = InMemoryStore::new();
        store.create_with_account(new_credential("alice")).await.unwrap();
        let before = store.accounts.read().unwrap().len();

        let err = store.create_with_account(new_credential("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
        assert_eq!(store.accounts.read().unwrap().len(), before);
    }

    #[tokio::test]
    async fn transfer_in_either_direction() {
        let store = InMemoryStore::new();
        let low = store.seed_account("low", 100).unwrap();
        let high = store.seed_account("high", 100).unwrap();

        let out = store
            .transfer(TransferIntent::new(high, low, 30).unwrap())
            .await
            .unwrap();
        assert_eq!((out.source_balance, out.target_balance), (70, 130));

        let out = store
            .transfer(TransferIntent::new(low, high, 130).unwrap())
            .await
            .unwrap();
        assert_eq!((out.source_balance, out.target_balance), (0, 200));
    }

    #[tokio::test]
    async fn missing_target_is_not_found_and_source_untouched() {
        let store = InMemoryStore::new();
        let src = store.seed_account("src", 100).unwrap();

        let err = store
            .transfer(TransferIntent::new(src, AccountId::new(999), 10).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(store.load_account(src).await.unwrap().unwrap().balance, 100);
    }

    #[tokio::test]
    async fn overdraft_is_rejected_under_lock() {
        let store = InMemoryStore::new();
        let src = store.seed_account("src", 10).unwrap();
        let dst = store.seed_account("dst", 0).unwrap();

        let err = store
            .transfer(TransferIntent::new(src, dst, 11).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Ledger(LedgerError::InsufficientFunds { available: 10, requested: 11 })
        ));
    }

    #[test]
    fn negative_seed_is_refused() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.seed_account("x", -1),
            Err(StoreError::BalanceConstraint(_))
        ));
    }
}
