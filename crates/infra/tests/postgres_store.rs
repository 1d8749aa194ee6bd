//! Postgres store tests. They run only when `TALLY_TEST_DATABASE_URL` points
//! at a disposable database; otherwise each test returns immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sqlx::PgPool;

use tally_auth::NewCredential;
use tally_core::{AccountId, ServiceError};
use tally_infra::db::ensure_schema;
use tally_infra::{CredentialStore, DatabaseConfig, LedgerEngine, LedgerStore, PostgresStore, StoreError};
use tally_ledger::Amount;

async fn pool() -> Option<PgPool> {
    let url = std::env::var("TALLY_TEST_DATABASE_URL").ok()?;
    let mut config = DatabaseConfig::new(url);
    config.min_connections = 0;
    config.max_connections = 8;
    let pool = config.connect().await.expect("connect");
    ensure_schema(&pool).await.expect("schema");
    Some(pool)
}

fn unique(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

async fn signup(store: &PostgresStore, username: &str) -> AccountId {
    store
        .create_with_account(NewCredential {
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            account_name: username.to_string(),
        })
        .await
        .expect("signup")
        .account_id
}

#[tokio::test]
async fn signup_creates_credential_and_empty_account() {
    let Some(pool) = pool().await else { return };
    let store = PostgresStore::new(pool);
    let username = unique("alice");

    let account_id = signup(&store, &username).await;
    let credential = store.find_by_username(&username).await.unwrap().unwrap();
    assert_eq!(credential.account_id, account_id);
    assert_eq!(credential.auth_id.get(), account_id.get());

    let account = store.load_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, 0);

    let err = store
        .create_with_account(NewCredential {
            username,
            password_hash: "x".to_string(),
            account_name: "dup".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists));
}

#[tokio::test]
async fn top_up_and_transfer_commit_together() {
    let Some(pool) = pool().await else { return };
    let store = PostgresStore::new(pool).with_statement_timeout(Duration::from_secs(2));
    let a = signup(&store, &unique("a")).await;
    let b = signup(&store, &unique("b")).await;

    let account = store.top_up(a, Amount::new(500).unwrap()).await.unwrap();
    assert_eq!(account.balance, 500);

    let engine = LedgerEngine::new(Arc::new(store.clone()), Duration::from_secs(5));
    let outcome = engine.transfer(a, b, 200).await.unwrap();
    assert_eq!((outcome.source_balance, outcome.target_balance), (300, 200));

    assert_eq!(engine.transfer(a, b, 301).await.unwrap_err(), ServiceError::InsufficientFunds);
    assert_eq!(engine.balance(a).await.unwrap(), 300);
    assert_eq!(engine.balance(b).await.unwrap(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_cannot_overdraw() {
    let Some(pool) = pool().await else { return };
    let store = PostgresStore::new(pool);
    let a = signup(&store, &unique("a")).await;
    let b = signup(&store, &unique("b")).await;
    store.top_up(a, Amount::new(100).unwrap()).await.unwrap();

    let engine = LedgerEngine::new(Arc::new(store), Duration::from_secs(5));
    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.transfer(a, b, 60).await }
    });
    let second = tokio::spawn({
        let engine = engine.clone();
        async move { engine.transfer(a, b, 60).await }
    });
    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert!(first.is_ok() ^ second.is_ok());
    assert!(matches!(
        first.and(second),
        Err(ServiceError::InsufficientFunds)
    ));
    assert_eq!(engine.balance(a).await.unwrap(), 40);
    assert_eq!(engine.balance(b).await.unwrap(), 60);
}
