use tally_auth::Principal;
use tally_core::{AccountId, AuthId};

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware; every route behind it can rely on it
/// being present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn auth_id(&self) -> AuthId {
        self.principal.auth_id
    }

    pub fn account_id(&self) -> AccountId {
        self.principal.account_id
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }
}
