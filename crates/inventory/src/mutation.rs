//! Mutation planning: the decision half of every item handler.
//!
//! Each `plan_*` function takes the current state and the validated request
//! and returns a [`Mutation`]: the item write together with the ledger entry
//! describing it. Planning performs no IO; the store commits the item write and
//! the ledger append as one atomic unit, so the sum of an item's ledger
//! changes always equals its quantity.
//!
//! Quantity arithmetic is checked. A result outside
//! `QUANTITY_MIN..=QUANTITY_MAX` is reported as a `quantity` field error.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use stockledger_core::{ItemId, MovementId, UserId};

use crate::item::{Item, QUANTITY_MAX, QUANTITY_MIN, ValidItem, check_quantity_range};
use crate::movement::{MovementAction, MovementEntry};
use crate::validation::ValidationErrors;

/// Observation recorded on the ledger entry written by a delete.
pub const DELETE_OBSERVATION: &str = "item deleted";

/// The item-side half of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemWrite {
    Insert(Item),
    Update(Item),
    Delete(ItemId),
}

impl ItemWrite {
    pub fn item_id(&self) -> ItemId {
        match self {
            ItemWrite::Insert(item) | ItemWrite::Update(item) => item.id,
            ItemWrite::Delete(id) => *id,
        }
    }
}

/// An item write plus the ledger entry that records it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub write: ItemWrite,
    pub entry: MovementEntry,
}

impl Mutation {
    /// The item as it looks after the mutation, if it still exists.
    pub fn item(&self) -> Option<&Item> {
        match &self.write {
            ItemWrite::Insert(item) | ItemWrite::Update(item) => Some(item),
            ItemWrite::Delete(_) => None,
        }
    }
}

/// Raw increase/decrease input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StockAdjustment {
    pub quantity: Option<i64>,
    pub observation: Option<String>,
}

impl StockAdjustment {
    /// Returns the strictly positive amount and the observation (blank → `None`).
    ///
    /// Non-positive amounts are a validation error rather than a silent no-op.
    fn validate(self) -> Result<(i64, Option<String>), ValidationErrors> {
        let amount = match self.quantity {
            None => return Err(ValidationErrors::single("quantity", "this field is required")),
            Some(q) if q < 1 => {
                return Err(ValidationErrors::single(
                    "quantity",
                    "ensure this value is greater than or equal to 1",
                ));
            }
            Some(q) => check_quantity_range(q)?,
        };
        let observation = self
            .observation
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty());
        Ok((amount, observation))
    }
}

fn out_of_range() -> ValidationErrors {
    ValidationErrors::single(
        "quantity",
        format!("resulting stock must be between {QUANTITY_MIN} and {QUANTITY_MAX}"),
    )
}

fn entry(
    item: &Item,
    change: i64,
    action: MovementAction,
    actor: UserId,
    observation: Option<String>,
    now: DateTime<Utc>,
) -> MovementEntry {
    MovementEntry {
        id: MovementId::new(),
        item_id: Some(item.id),
        item_name: item.name.clone(),
        change,
        action,
        timestamp: now,
        user_id: Some(actor),
        observation,
    }
}

/// Create a new item owned by `owner`; the ADD entry records the opening stock.
pub fn plan_create(owner: UserId, valid: ValidItem, now: DateTime<Utc>) -> Mutation {
    let item = Item {
        id: ItemId::new(),
        name: valid.name,
        quantity: valid.quantity,
        category_id: valid.category_id,
        owner,
        created_at: now,
    };
    let entry = entry(&item, item.quantity, MovementAction::Add, owner, None, now);
    Mutation {
        write: ItemWrite::Insert(item),
        entry,
    }
}

/// Replace name, quantity and category. The EDIT entry carries the raw signed
/// delta, including zero.
pub fn plan_edit(
    current: &Item,
    valid: ValidItem,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Mutation, ValidationErrors> {
    let delta = valid
        .quantity
        .checked_sub(current.quantity)
        .ok_or_else(out_of_range)?;
    let item = Item {
        name: valid.name,
        quantity: valid.quantity,
        category_id: valid.category_id,
        ..current.clone()
    };
    let entry = entry(&item, delta, MovementAction::Edit, actor, None, now);
    Ok(Mutation {
        write: ItemWrite::Update(item),
        entry,
    })
}

pub fn plan_increase(
    current: &Item,
    adjustment: StockAdjustment,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Mutation, ValidationErrors> {
    let (amount, observation) = adjustment.validate()?;
    adjust(current, amount, MovementAction::Increase, actor, observation, now)
}

pub fn plan_decrease(
    current: &Item,
    adjustment: StockAdjustment,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Mutation, ValidationErrors> {
    let (amount, observation) = adjustment.validate()?;
    adjust(current, -amount, MovementAction::Decrease, actor, observation, now)
}

fn adjust(
    current: &Item,
    delta: i64,
    action: MovementAction,
    actor: UserId,
    observation: Option<String>,
    now: DateTime<Utc>,
) -> Result<Mutation, ValidationErrors> {
    let quantity = current
        .quantity
        .checked_add(delta)
        .filter(|q| (QUANTITY_MIN..=QUANTITY_MAX).contains(q))
        .ok_or_else(out_of_range)?;
    let item = Item {
        quantity,
        ..current.clone()
    };
    let entry = entry(&item, delta, action, actor, observation, now);
    Ok(Mutation {
        write: ItemWrite::Update(item),
        entry,
    })
}

/// Remove the item; the REMOVE entry zeroes out its ledger balance.
pub fn plan_delete(
    current: &Item,
    actor: UserId,
    now: DateTime<Utc>,
) -> Result<Mutation, ValidationErrors> {
    let change = current.quantity.checked_neg().ok_or_else(out_of_range)?;
    let entry = entry(
        current,
        change,
        MovementAction::Remove,
        actor,
        Some(DELETE_OBSERVATION.to_string()),
        now,
    );
    Ok(Mutation {
        write: ItemWrite::Delete(current.id),
        entry,
    })
}
