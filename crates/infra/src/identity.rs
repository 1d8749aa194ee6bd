//! Signup, login, and token validation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::instrument;

use tally_auth::{
    Credential, JwtValidator, NewCredential, PasswordError, PasswordHasher, Principal, TokenIssuer,
};
use tally_core::{AccountId, ServiceError, ServiceResult};

use crate::bounded;
use crate::store::CredentialStore;

/// Verified against when the username is unknown, so both login failure
/// paths do the same hashing work.
const DUMMY_PASSWORD: &str = "tally-dummy-password";

/// Token handed back by a successful login.
#[derive(Clone)]
pub struct LoginOutcome {
    pub username: String,
    pub token: String,
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<dyn TokenIssuer>,
    validator: Arc<dyn JwtValidator>,
    dummy_hash: Arc<str>,
    timeout: Duration,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        issuer: Arc<dyn TokenIssuer>,
        validator: Arc<dyn JwtValidator>,
        timeout: Duration,
    ) -> Result<Self, PasswordError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            hasher,
            issuer,
            validator,
            dummy_hash: Arc::from(dummy_hash),
            timeout,
        })
    }

    /// Register a credential and open its zero-balance account.
    #[instrument(skip(self, password), err)]
    pub async fn signup(&self, username: &str, password: &str, name: &str) -> ServiceResult<AccountId> {
        require("username", username)?;
        require("password", password)?;
        require("name", name)?;

        let existing = bounded(self.timeout, "find_by_username", self.store.find_by_username(username)).await?;
        if existing.is_some() {
            return Err(ServiceError::AlreadyExists);
        }

        let password_hash = self.hash(password).await?;
        let credential = bounded(
            self.timeout,
            "create_with_account",
            self.store.create_with_account(NewCredential {
                username: username.to_string(),
                password_hash,
                account_name: name.to_string(),
            }),
        )
        .await?;

        tracing::info!(account_id = %credential.account_id, "account created");
        Ok(credential.account_id)
    }

    /// Exchange a username and password for a signed token.
    ///
    /// Unknown username and wrong password are indistinguishable to the
    /// caller: both are `Unauthenticated`.
    #[instrument(skip(self, password), err)]
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<LoginOutcome> {
        require("username", username)?;
        require("password", password)?;

        let found = bounded(self.timeout, "find_by_username", self.store.find_by_username(username)).await?;

        let hash = match &found {
            Some(credential) => credential.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };
        let verified = self.verify(password, hash).await?;

        let credential: Credential = match found {
            Some(credential) if verified => credential,
            _ => {
                tracing::info!("login rejected");
                return Err(ServiceError::Unauthenticated);
            }
        };

        let token = self.issuer.issue(&credential, Utc::now())?;
        Ok(LoginOutcome {
            username: credential.username,
            token,
        })
    }

    /// Resolve a token to the identity it was issued for.
    pub fn validate(&self, token: &str) -> ServiceResult<Principal> {
        let claims = self.validator.validate(token, Utc::now()).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            ServiceError::from(e)
        })?;
        Ok(claims.principal())
    }

    pub fn validator(&self) -> Arc<dyn JwtValidator> {
        Arc::clone(&self.validator)
    }

    async fn hash(&self, password: &str) -> ServiceResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::internal(format!("hashing task failed: {e}")))?
            .map_err(|e| ServiceError::internal(e.to_string()))
    }

    async fn verify(&self, password: &str, hash: String) -> ServiceResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ServiceError::internal(format!("verification task failed: {e}")))
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn require(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid_input(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, LedgerStore};
    use tally_auth::{
        Argon2PasswordHasher, Hs256JwtValidator, Hs256TokenIssuer, PasswordHasherConfig,
        SigningKey,
    };

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes!!";

    fn service(store: Arc<InMemoryStore>) -> IdentityService {
        let key = SigningKey::from_secret(SECRET).unwrap();
        let hasher = Argon2PasswordHasher::new(PasswordHasherConfig::low_cost()).unwrap();
        IdentityService::new(
            store,
            Arc::new(hasher),
            Arc::new(Hs256TokenIssuer::new(&key, chrono::Duration::hours(2))),
            Arc::new(Hs256JwtValidator::new(&key)),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn signup_then_login_then_validate() {
        let store = Arc::new(InMemoryStore::new());
        let identity = service(Arc::clone(&store));

        let account_id = identity.signup("alice", "pw1", "Alice").await.unwrap();
        let account = store.load_account(account_id).await.unwrap().unwrap();
        assert_eq!(account.balance, 0);
        assert_eq!(account.name, "Alice");

        let login = identity.login("alice", "pw1").await.unwrap();
        assert_eq!(login.username, "alice");

        let principal = identity.validate(&login.token).unwrap();
        assert_eq!(principal.account_id, account_id);
        assert_eq!(principal.auth_id.get(), account_id.get());
        assert_eq!(principal.username, "alice");
    }

    #[tokio::test]
    async fn stored_password_is_hashed() {
        let store = Arc::new(InMemoryStore::new());
        let identity = service(Arc::clone(&store));
        identity.signup("alice", "pw1", "Alice").await.unwrap();

        let credential = store.find_by_username("alice").await.unwrap().unwrap();
        assert_ne!(credential.password_hash, "pw1");
        assert!(credential.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let identity = service(Arc::new(InMemoryStore::new()));
        identity.signup("alice", "pw1", "Alice").await.unwrap();
        assert_eq!(
            identity.signup("alice", "other", "Someone").await.unwrap_err(),
            ServiceError::AlreadyExists
        );
    }

    #[tokio::test]
    async fn missing_fields_are_invalid_input() {
        let identity = service(Arc::new(InMemoryStore::new()));
        for (u, p, n) in [("", "pw", "N"), ("u", "", "N"), ("u", "pw", " ")] {
            let err = identity.signup(u, p, n).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)), "{u:?} {p:?} {n:?}");
        }
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let identity = service(Arc::new(InMemoryStore::new()));
        identity.signup("alice", "pw1", "Alice").await.unwrap();

        let wrong = identity.login("alice", "nope").await.unwrap_err();
        let unknown = identity.login("mallory", "pw1").await.unwrap_err();
        assert_eq!(wrong, ServiceError::Unauthenticated);
        assert_eq!(unknown, ServiceError::Unauthenticated);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let identity = service(Arc::new(InMemoryStore::new()));
        assert_eq!(identity.validate("not-a-token").unwrap_err(), ServiceError::Unauthenticated);
    }

    #[tokio::test]
    async fn token_from_another_key_is_unauthenticated() {
        let identity = service(Arc::new(InMemoryStore::new()));
        identity.signup("alice", "pw1", "Alice").await.unwrap();

        let other_key = SigningKey::from_secret("a-completely-different-secret-value").unwrap();
        let credential = Credential {
            auth_id: tally_core::AuthId::new(1),
            account_id: AccountId::new(1),
            username: "alice".into(),
            password_hash: String::new(),
        };
        let forged = Hs256TokenIssuer::new(&other_key, chrono::Duration::hours(1))
            .issue(&credential, Utc::now())
            .unwrap();
        assert_eq!(identity.validate(&forged).unwrap_err(), ServiceError::Unauthenticated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signups_for_one_username_create_one_account() {
        let store = Arc::new(InMemoryStore::new());
        let identity = service(Arc::clone(&store));

        let mut handles = Vec::new();
        for i in 0..8 {
            let identity = identity.clone();
            handles.push(tokio::spawn(async move {
                identity.signup("alice", "pw", &format!("Alice {i}")).await
            }));
        }
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert_eq!(e, ServiceError::AlreadyExists),
            }
        }
        assert_eq!(created, 1);
    }
}
