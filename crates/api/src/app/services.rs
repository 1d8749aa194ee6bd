//! Store selection and service wiring.

use std::sync::Arc;

use anyhow::Context;

use tally_auth::{Argon2PasswordHasher, Hs256JwtValidator, Hs256TokenIssuer, SigningKey};
use tally_infra::db::ensure_schema;
use tally_infra::{
    AppConfig, CredentialStore, IdentityService, InMemoryStore, LedgerEngine, LedgerStore,
    PostgresStore,
};

/// Everything the handlers need, shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub identity: IdentityService,
    pub ledger: LedgerEngine,
}

/// Wire services against Postgres when a database is configured, otherwise
/// against the in-memory store.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.database {
        Some(db) => {
            let pool = db.connect().await.context("connecting to postgres")?;
            ensure_schema(&pool).await.context("applying schema")?;
            let store = PostgresStore::new(pool).with_statement_timeout(config.store_timeout);
            wire(Arc::new(store), config)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; balances and credentials live in memory only");
            wire(Arc::new(InMemoryStore::new()), config)
        }
    }
}

fn wire<S>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<AppServices>
where
    S: CredentialStore + LedgerStore + 'static,
{
    let key = SigningKey::from_secret(&config.signing_secret).context("JWT_SECRET")?;
    let ttl = chrono::Duration::from_std(config.token_ttl).context("TOKEN_TTL_SECS")?;
    let hasher = Argon2PasswordHasher::new(config.password).context("password hasher")?;

    let identity = IdentityService::new(
        store.clone(),
        Arc::new(hasher),
        Arc::new(Hs256TokenIssuer::new(&key, ttl)),
        Arc::new(Hs256JwtValidator::new(&key)),
        config.store_timeout,
    )
    .context("identity service")?;
    let ledger = LedgerEngine::new(store, config.store_timeout);

    Ok(AppServices { identity, ledger })
}
