use serde::{Deserialize, Serialize};

use tally_core::{AccountId, AuthId};

/// Identity of an authenticated caller, as resolved from a validated token.
///
/// This is what the authorization gate hands to ledger handlers; it carries a
/// copy of the identity facts that were true when the token was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub auth_id: AuthId,
    pub account_id: AccountId,
    pub username: String,
}
