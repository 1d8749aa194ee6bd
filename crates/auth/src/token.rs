//! HS256 bearer tokens: issuance and validation.
//!
//! Tokens are self-verifying; no session state is kept server-side. Anyone
//! holding the [`SigningKey`] can both issue and validate.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{validate_claims, Claims, Credential, SigningKey, TokenError};

/// Produces signed, expiring tokens for a credential.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, credential: &Credential, now: DateTime<Utc>) -> Result<String, TokenError>;
}

/// Verifies a token and extracts its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError>;
}

/// HS256 issuer with a fixed time-to-live.
#[derive(Clone)]
pub struct Hs256TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl Hs256TokenIssuer {
    pub fn new(key: &SigningKey, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(key.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claims this issuer would embed for `credential` at `now`.
    pub fn claims_for(&self, credential: &Credential, now: DateTime<Utc>) -> Claims {
        Claims::for_credential(credential, now.trunc_subsecs(0), self.ttl)
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}

impl TokenIssuer for Hs256TokenIssuer {
    fn issue(&self, credential: &Credential, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.sign(&self.claims_for(credential, now))
    }
}

impl core::fmt::Debug for Hs256TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// HS256-only validator.
///
/// Tokens whose header declares any other algorithm are rejected before the
/// signature is looked at. Expiry is checked against the caller's clock, not
/// the library's, so validation stays a pure function of (token, key, now).
#[derive(Clone)]
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(key: &SigningKey) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(key.as_bytes()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| map_jwt_error(e.kind()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

fn map_jwt_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
            TokenError::UnexpectedAlgorithm
        }
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
