use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, ItemId, MovementId, UserId};

/// What kind of mutation produced a ledger entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementAction {
    Add,
    Remove,
    Edit,
    Increase,
    Decrease,
}

impl MovementAction {
    pub const ALL: [MovementAction; 5] = [
        MovementAction::Add,
        MovementAction::Remove,
        MovementAction::Edit,
        MovementAction::Increase,
        MovementAction::Decrease,
    ];

    /// Stable storage/wire code.
    pub fn as_str(self) -> &'static str {
        match self {
            MovementAction::Add => "ADD",
            MovementAction::Remove => "REMOVE",
            MovementAction::Edit => "EDIT",
            MovementAction::Increase => "INCREASE",
            MovementAction::Decrease => "DECREASE",
        }
    }

    /// Human-readable label for listings.
    pub fn label(self) -> &'static str {
        match self {
            MovementAction::Add => "Added",
            MovementAction::Remove => "Removed",
            MovementAction::Edit => "Edited",
            MovementAction::Increase => "Increased",
            MovementAction::Decrease => "Decreased",
        }
    }
}

impl core::fmt::Display for MovementAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown movement action '{s}'")))
    }
}

/// Direction of a quantity change, derived from the signed delta.
///
/// EDIT entries can move stock either way; deriving direction from the sign
/// gives every entry the same reading regardless of which handler wrote it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
    Unchanged,
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementEntry {
    pub id: MovementId,
    /// `None` once the item has been deleted.
    pub item_id: Option<ItemId>,
    /// Item name at the time of the movement.
    pub item_name: String,
    /// Signed quantity delta.
    pub change: i64,
    pub action: MovementAction,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub observation: Option<String>,
}

impl MovementEntry {
    pub fn direction(&self) -> Direction {
        match self.change {
            c if c > 0 => Direction::Inbound,
            c if c < 0 => Direction::Outbound,
            _ => Direction::Unchanged,
        }
    }
}

/// Which ledger entries a caller may read or clear.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LedgerScope {
    /// Every user's entries (superuser).
    All,
    /// Entries recorded by one user.
    User(UserId),
}

impl LedgerScope {
    pub fn for_principal(user: UserId, superuser: bool) -> Self {
        if superuser {
            LedgerScope::All
        } else {
            LedgerScope::User(user)
        }
    }

    pub fn includes(&self, entry: &MovementEntry) -> bool {
        match self {
            LedgerScope::All => true,
            LedgerScope::User(user) => entry.user_id == Some(*user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(change: i64, user_id: Option<UserId>) -> MovementEntry {
        MovementEntry {
            id: MovementId::new(),
            item_id: Some(ItemId::new()),
            item_name: "BOLT".to_string(),
            change,
            action: MovementAction::Edit,
            timestamp: Utc::now(),
            user_id,
            observation: None,
        }
    }

    #[test]
    fn action_codes_parse_back() {
        for action in MovementAction::ALL {
            assert_eq!(action.as_str().parse::<MovementAction>().unwrap(), action);
        }
        assert!("SOLD".parse::<MovementAction>().is_err());
    }

    #[test]
    fn direction_follows_sign() {
        assert_eq!(entry(4, None).direction(), Direction::Inbound);
        assert_eq!(entry(-4, None).direction(), Direction::Outbound);
        assert_eq!(entry(0, None).direction(), Direction::Unchanged);
    }

    #[test]
    fn user_scope_only_includes_own_entries() {
        let me = UserId::new();
        let other = UserId::new();
        let scope = LedgerScope::for_principal(me, false);

        assert!(scope.includes(&entry(1, Some(me))));
        assert!(!scope.includes(&entry(1, Some(other))));
        assert!(!scope.includes(&entry(1, None)));
        assert!(LedgerScope::for_principal(me, true).includes(&entry(1, Some(other))));
    }
}
