use serde::Serialize;

use tally_core::{AccountId, AuthId};

/// Stored login identity.
///
/// `password_hash` is an opaque PHC string; it is never compared as plaintext
/// and never serialized.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub auth_id: AuthId,
    pub account_id: AccountId,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credential")
            .field("auth_id", &self.auth_id)
            .field("account_id", &self.account_id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Input to the signup unit: a credential plus the display name of the
/// account created alongside it.
#[derive(Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub username: String,
    pub password_hash: String,
    pub account_name: String,
}

impl core::fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewCredential")
            .field("username", &self.username)
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}
