//! Inventory persistence.
//!
//! One trait, two backends: an in-memory store for dev/tests and a Postgres
//! store for deployments. Both commit a [`Mutation`] (item write + ledger
//! entry) atomically, so no handler can leave an item and its ledger out of
//! step.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use stockledger_core::{CategoryId, ItemId, UserId};
use stockledger_inventory::{Category, Item, LedgerScope, MostSoldRow, MovementEntry, Mutation};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;

/// An item joined with its category name, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedItem {
    #[serde(flatten)]
    pub item: Item,
    pub category_name: Option<String>,
}

/// Storage operation error.
///
/// Infrastructure failures only; validation and visibility are decided by
/// the service before anything reaches the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The item changed (or vanished) between being read and being written.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// A stored row could not be decoded into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// The backend cannot serve requests (closed pool, poisoned lock, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence contract for items, categories and the movement ledger.
#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get_item(&self, id: ItemId) -> Result<Option<ListedItem>, StoreError>;

    /// Items owned by `owner`, oldest first.
    async fn list_items(&self, owner: UserId) -> Result<Vec<ListedItem>, StoreError>;

    /// Apply the item write and append the ledger entry as one atomic unit.
    ///
    /// Updates and deletes are guarded by the quantity the mutation was
    /// planned against (`new quantity - change`); if the stored quantity
    /// differs, nothing is written and [`StoreError::Conflict`] is returned.
    async fn commit(&self, mutation: &Mutation) -> Result<(), StoreError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// All categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError>;

    /// Delete a category and null the reference on its items.
    /// Returns `false` if it did not exist.
    async fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError>;

    /// Ledger entries in scope, newest first.
    async fn list_movements(&self, scope: LedgerScope) -> Result<Vec<MovementEntry>, StoreError>;

    /// Remove the ledger entries in scope; returns how many were removed.
    async fn clear_movements(&self, scope: LedgerScope) -> Result<u64, StoreError>;

    /// Most-sold ranking over the entries in scope.
    async fn most_sold(
        &self,
        scope: LedgerScope,
        limit: usize,
    ) -> Result<Vec<MostSoldRow>, StoreError>;
}

#[async_trait::async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn get_item(&self, id: ItemId) -> Result<Option<ListedItem>, StoreError> {
        (**self).get_item(id).await
    }

    async fn list_items(&self, owner: UserId) -> Result<Vec<ListedItem>, StoreError> {
        (**self).list_items(owner).await
    }

    async fn commit(&self, mutation: &Mutation) -> Result<(), StoreError> {
        (**self).commit(mutation).await
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        (**self).get_category(id).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        (**self).list_categories().await
    }

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        (**self).insert_category(category).await
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        (**self).delete_category(id).await
    }

    async fn list_movements(&self, scope: LedgerScope) -> Result<Vec<MovementEntry>, StoreError> {
        (**self).list_movements(scope).await
    }

    async fn clear_movements(&self, scope: LedgerScope) -> Result<u64, StoreError> {
        (**self).clear_movements(scope).await
    }

    async fn most_sold(
        &self,
        scope: LedgerScope,
        limit: usize,
    ) -> Result<Vec<MostSoldRow>, StoreError> {
        (**self).most_sold(scope, limit).await
    }
}

/// Quantity the stored item must have for an update or delete to apply.
///
/// A mutation whose change cannot be reversed within `i64` matches no stored
/// quantity and is refused as a conflict.
pub(crate) fn expected_prior_quantity(mutation: &Mutation) -> Result<i64, StoreError> {
    let expected = match mutation.item() {
        Some(item) => item.quantity.checked_sub(mutation.entry.change),
        // Delete: the REMOVE entry is -quantity.
        None => mutation.entry.change.checked_neg(),
    };
    expected.ok_or_else(|| {
        StoreError::Conflict(format!(
            "movement {} change {} is out of range for item {}",
            mutation.entry.id,
            mutation.entry.change,
            mutation.write.item_id()
        ))
    })
}
