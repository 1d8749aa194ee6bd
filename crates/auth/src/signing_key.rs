//! Process-wide token signing key.

use std::sync::Arc;

use thiserror::Error;

/// Recommended minimum key length for HS256 (bytes).
pub const RECOMMENDED_MIN_KEY_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningKeyError {
    #[error("signing key must not be empty")]
    Empty,
}

/// Symmetric key shared by the token issuer and validator.
///
/// Read-only after construction; cloning shares the same bytes.
#[derive(Clone)]
pub struct SigningKey(Arc<[u8]>);

impl SigningKey {
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Result<Self, SigningKeyError> {
        let bytes = secret.as_ref();
        if bytes.is_empty() {
            return Err(SigningKeyError::Empty);
        }
        if bytes.len() < RECOMMENDED_MIN_KEY_LEN {
            tracing::warn!(
                key_len = bytes.len(),
                "signing key is shorter than {RECOMMENDED_MIN_KEY_LEN} bytes"
            );
        }
        Ok(Self(Arc::from(bytes)))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SigningKey(<{} bytes redacted>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        assert_eq!(SigningKey::from_secret("").unwrap_err(), SigningKeyError::Empty);
    }

    #[test]
    fn debug_is_redacted() {
        let key = SigningKey::from_secret("super-secret-value").unwrap();
        let out = format!("{key:?}");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("18 bytes"));
    }
}
