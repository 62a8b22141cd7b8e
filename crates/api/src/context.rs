use stockledger_auth::{Principal, Role};
use stockledger_core::UserId;
use stockledger_infra::Actor;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn principal(&self) -> Principal {
        Principal::from_roles(self.user_id, self.roles.clone())
    }

    pub fn is_superuser(&self) -> bool {
        self.principal().is_superuser()
    }

    /// The identity the ledger service acts on behalf of.
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            superuser: self.is_superuser(),
        }
    }
}
