use std::collections::HashSet;

use thiserror::Error;

use stockledger_core::UserId;

use crate::{Permission, Role};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Resolve permissions from roles via [`permissions_for_roles`].
    pub fn from_roles(user_id: UserId, roles: Vec<Role>) -> Self {
        let permissions = permissions_for_roles(&roles);
        Self {
            user_id,
            roles,
            permissions,
        }
    }

    /// Superusers see every user's ledger entries and may clear all of them.
    pub fn is_superuser(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check that `principal` holds `required` (or the wildcard).
///
/// Pure policy check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains(Permission::WILDCARD) || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Static role → permission policy.
///
/// - `admin`: wildcard
/// - `staff`: everything except category management
/// - `viewer`: read-only
///
/// Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(Role::is_admin) {
        return vec![Permission::new(Permission::WILDCARD)];
    }

    let mut granted: Vec<&'static str> = Vec::new();
    for role in roles {
        let perms: &[&'static str] = match role.as_str() {
            Role::STAFF => &[
                Permission::ITEMS_READ,
                Permission::ITEMS_WRITE,
                Permission::LOGS_READ,
                Permission::LOGS_CLEAR,
                Permission::REPORTS_READ,
            ],
            Role::VIEWER => &[
                Permission::ITEMS_READ,
                Permission::LOGS_READ,
                Permission::REPORTS_READ,
            ],
            _ => &[],
        };
        for p in perms {
            if !granted.contains(p) {
                granted.push(*p);
            }
        }
    }

    granted.into_iter().map(Permission::new).collect()
}
