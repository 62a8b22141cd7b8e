//! API-side authorization guard.
//!
//! Routes call [`require`] before touching the ledger service; the service
//! itself only knows about ownership and ledger scope.

use stockledger_auth::{AuthzError, Permission, authorize};
use stockledger_infra::Actor;

use crate::context::PrincipalContext;

/// Check that the request principal holds `permission` and return the actor
/// to run the operation as.
pub fn require(
    principal: &PrincipalContext,
    permission: &'static str,
) -> Result<Actor, AuthzError> {
    authorize(&principal.principal(), &Permission::new(permission))?;
    Ok(principal.actor())
}
