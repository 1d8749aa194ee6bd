//! Postgres-backed credential and ledger store.
//!
//! ## Atomic units
//!
//! Every mutating method runs in one transaction. Rows are locked with
//! `SELECT … FOR UPDATE`; the transfer unit locks its two rows one statement
//! at a time in ascending `account_id` order, so two opposite transfers
//! between the same pair always queue on the same first row instead of
//! deadlocking. Balances used for the funds check are the ones read under the
//! lock. Any failing step rolls the transaction back explicitly before the
//! error is returned.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` |
//! | Database (check violation) | `23514` | `BalanceConstraint` |
//! | Database (query canceled / lock timeout / deadlock / serialization) | `57014`, `55P03`, `40P01`, `40001` | `Unavailable` |
//! | Database (other) | Any other | `Backend` |
//! | PoolTimedOut | N/A | `Unavailable` |
//! | Other | N/A | `Backend` |

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use tally_auth::{Credential, NewCredential};
use tally_core::{AccountId, AuthId};
use tally_ledger::{apply_transfer, Account, Amount, TransferIntent, TransferOutcome};

use super::{CredentialStore, LedgerStore, StoreError};

/// Postgres store. `Send + Sync`; clone freely (the pool is shared).
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    statement_timeout: Option<Duration>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: None,
        }
    }

    /// Bound every statement inside a unit (`SET LOCAL statement_timeout`).
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self, operation: &str) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        if let Some(timeout) = self.statement_timeout {
            let setting = format!("{}ms", timeout.as_millis());
            if let Err(e) = sqlx::query("SELECT set_config('statement_timeout', $1, true)")
                .bind(setting)
                .execute(&mut *tx)
                .await
            {
                return abort(tx, operation, map_sqlx_error(operation, e)).await;
            }
        }

        Ok(tx)
    }
}

#[async_trait]
impl CredentialStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT auth_id, account_id, username, password
            FROM auth
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_username", e))?;

        row.map(|r| credential_from_row(&r)).transpose()
    }

    #[instrument(skip(self, new), fields(username = %new.username), err)]
    async fn create_with_account(&self, new: NewCredential) -> Result<Credential, StoreError> {
        let mut tx = self.begin("create_with_account").await?;

        let result = async {
            let existing = sqlx::query("SELECT auth_id FROM auth WHERE username = $1")
                .bind(&new.username)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("check_username", e))?;
            if existing.is_some() {
                return Err(StoreError::AlreadyExists);
            }

            let id: i64 = sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('auth', 'auth_id'))")
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("next_auth_id", e))?;

            sqlx::query(
                r#"
                INSERT INTO auth (auth_id, account_id, username, password)
                VALUES ($1, $1, $2, $3)
                "#,
            )
            .bind(id)
            .bind(&new.username)
            .bind(&new.password_hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_auth", e))?;

            sqlx::query(
                r#"
                INSERT INTO account (account_id, name, balance)
                VALUES ($1, $2, 0)
                "#,
            )
            .bind(id)
            .bind(&new.account_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_account", e))?;

            Ok::<_, StoreError>(id)
        }
        .await;

        match result {
            Ok(id) => {
                commit(tx, "create_with_account").await?;
                Ok(Credential {
                    auth_id: AuthId::new(id),
                    account_id: AccountId::new(id),
                    username: new.username,
                    password_hash: new.password_hash,
                })
            }
            Err(e) => abort(tx, "create_with_account", e).await,
        }
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    #[instrument(skip_all, fields(account_id = %account_id), err)]
    async fn load_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT account_id, name, balance FROM account WHERE account_id = $1")
            .bind(account_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_account", e))?;

        row.map(|r| account_from_row(&r)).transpose()
    }

    #[instrument(skip_all, fields(account_id = %account_id, amount = %amount), err)]
    async fn top_up(&self, account_id: AccountId, amount: Amount) -> Result<Account, StoreError> {
        let mut tx = self.begin("top_up").await?;

        let result = async {
            let mut account = lock_account(&mut tx, account_id)
                .await?
                .ok_or(StoreError::NotFound)?;
            account.credit(amount)?;
            write_balance(&mut tx, &account).await?;
            Ok::<_, StoreError>(account)
        }
        .await;

        match result {
            Ok(account) => {
                commit(tx, "top_up").await?;
                Ok(account)
            }
            Err(e) => abort(tx, "top_up", e).await,
        }
    }

    #[instrument(
        skip_all,
        fields(
            source = %intent.source(),
            target = %intent.target(),
            amount = %intent.amount()
        ),
        err
    )]
    async fn transfer(&self, intent: TransferIntent) -> Result<TransferOutcome, StoreError> {
        let mut tx = self.begin("transfer").await?;

        let result = async {
            let [first_id, second_id] = intent.lock_order();
            let first = lock_account(&mut tx, first_id).await?;
            let second = lock_account(&mut tx, second_id).await?;
            let (Some(first), Some(second)) = (first, second) else {
                return Err(StoreError::NotFound);
            };

            let (mut source, mut target) = if first.account_id == intent.source() {
                (first, second)
            } else {
                (second, first)
            };

            let outcome = apply_transfer(&intent, &mut source, &mut target)?;
            write_balance(&mut tx, &source).await?;
            write_balance(&mut tx, &target).await?;
            Ok::<_, StoreError>(outcome)
        }
        .await;

        match result {
            Ok(outcome) => {
                commit(tx, "transfer").await?;
                Ok(outcome)
            }
            Err(e) => abort(tx, "transfer", e).await,
        }
    }
}

async fn lock_account(
    tx: &mut Transaction<'static, Postgres>,
    account_id: AccountId,
) -> Result<Option<Account>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT account_id, name, balance
        FROM account
        WHERE account_id = $1
        FOR UPDATE
        "#,
    )
    .bind(account_id.get())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_account", e))?;

    row.map(|r| account_from_row(&r)).transpose()
}

async fn write_balance(
    tx: &mut Transaction<'static, Postgres>,
    account: &Account,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE account SET balance = $2 WHERE account_id = $1")
        .bind(account.account_id.get())
        .bind(account.balance)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("write_balance", e))?;

    if result.rows_affected() != 1 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

async fn commit(tx: Transaction<'static, Postgres>, operation: &str) -> Result<(), StoreError> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error(&format!("{operation}: commit"), e))
}

/// Roll back and surface `err`. A failed rollback is logged; the connection
/// is discarded by the pool in that case, so nothing is committed either way.
async fn abort<T>(
    tx: Transaction<'static, Postgres>,
    operation: &str,
    err: StoreError,
) -> Result<T, StoreError> {
    if let Err(rollback_err) = tx.rollback().await {
        tracing::error!(operation, error = %rollback_err, "rollback failed");
    }
    Err(err)
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Backend(format!("failed to decode account row: {e}"));
    Ok(Account {
        account_id: AccountId::new(row.try_get("account_id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        balance: row.try_get("balance").map_err(decode)?,
    })
}

fn credential_from_row(row: &PgRow) -> Result<Credential, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Backend(format!("failed to decode auth row: {e}"));
    Ok(Credential {
        auth_id: AuthId::new(row.try_get("auth_id").map_err(decode)?),
        account_id: AccountId::new(row.try_get("account_id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        password_hash: row.try_get("password").map_err(decode)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::AlreadyExists,
                Some("23514") => StoreError::BalanceConstraint(msg),
                Some("57014") | Some("55P03") | Some("40P01") | Some("40001") => {
                    StoreError::Unavailable(msg)
                }
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
