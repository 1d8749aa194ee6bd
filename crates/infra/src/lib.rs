//! Infrastructure layer: stores, database, configuration, and the two
//! orchestrators (ledger engine, identity service) that run atomic units
//! against a store.

pub mod config;
pub mod db;
pub mod identity;
pub mod ledger_engine;
pub mod store;

pub use config::{AppConfig, ConfigError, LogFormat};
pub use db::DatabaseConfig;
pub use identity::{IdentityService, LoginOutcome};
pub use ledger_engine::LedgerEngine;
pub use store::{CredentialStore, InMemoryStore, LedgerStore, PostgresStore, StoreError};

/// Run `fut` with an upper bound on its duration.
///
/// On expiry the future is dropped, which discards any open transaction
/// without committing it.
pub(crate) async fn bounded<T, F>(
    limit: std::time::Duration,
    operation: &'static str,
    fut: F,
) -> tally_core::ServiceResult<T>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "store operation timed out");
            Err(tally_core::ServiceError::unavailable(format!(
                "{operation} timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}
