use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "inventory.items.write"). The
/// wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: &'static str = "*";

    pub const ITEMS_READ: &'static str = "inventory.items.read";
    pub const ITEMS_WRITE: &'static str = "inventory.items.write";
    pub const CATEGORIES_MANAGE: &'static str = "inventory.categories.manage";
    pub const LOGS_READ: &'static str = "inventory.logs.read";
    pub const LOGS_CLEAR: &'static str = "inventory.logs.clear";
    pub const REPORTS_READ: &'static str = "inventory.reports.read";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
