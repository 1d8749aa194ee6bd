use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use tally_core::{AccountId, AuthId, ServiceError};

use crate::{Credential, Principal};

/// JWT claims model.
///
/// Timestamps are whole seconds on the wire (`iat`/`exp`), so a claims value
/// built by the issuer survives an encode/decode cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub auth_id: AuthId,
    pub account_id: AccountId,
    pub username: String,

    /// Token identifier (unique per issuance).
    pub jti: Uuid,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Claims for `credential`, valid from `issued_at` for `ttl`.
    pub fn for_credential(
        credential: &Credential,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            auth_id: credential.auth_id,
            account_id: credential.account_id,
            username: credential.username.clone(),
            jti: Uuid::now_v7(),
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            auth_id: self.auth_id,
            account_id: self.account_id,
            username: self.username.clone(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,

    #[error("token declares an unexpected signing algorithm")]
    UnexpectedAlgorithm,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for ServiceError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Encoding(msg) => ServiceError::Internal(msg),
            _ => ServiceError::Unauthenticated,
        }
    }
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature and algorithm checks happen during decoding; this only looks at
/// `iat`/`exp` against the supplied clock.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenError::Malformed);
    }
    if now < claims.issued_at {
        return Err(TokenError::NotYetValid);
    }
    if now > claims.expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn claims_at(issued_at: DateTime<Utc>, ttl: Duration) -> Claims {
        Claims {
            auth_id: AuthId::new(1),
            account_id: AccountId::new(1),
            username: "alice".to_string(),
            jti: Uuid::now_v7(),
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    #[test]
    fn valid_until_and_including_expiry() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::hours(2));

        assert_eq!(validate_claims(&claims, t0), Ok(()));
        assert_eq!(validate_claims(&claims, t0 + Duration::hours(2)), Ok(()));
        assert_eq!(
            validate_claims(&claims, t0 + Duration::hours(2) + Duration::seconds(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn future_issue_time_is_rejected() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::minutes(5));
        assert_eq!(
            validate_claims(&claims, t0 - Duration::seconds(1)),
            Err(TokenError::NotYetValid)
        );
    }

    #[test]
    fn inverted_window_is_malformed() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::seconds(-1));
        assert_eq!(validate_claims(&claims, t0), Err(TokenError::Malformed));
    }

    #[test]
    fn wire_names_are_iat_and_exp_seconds() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let claims = claims_at(t0, Duration::seconds(60));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["iat"], t0.timestamp());
        assert_eq!(json["exp"], t0.timestamp() + 60);
        assert_eq!(json["account_id"], 1);
        assert_eq!(json["username"], "alice");
    }
}
