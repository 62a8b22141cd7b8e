//! Application-level orchestration of the inventory handlers.
//!
//! Every item handler follows the same pipeline:
//!
//! ```text
//! Request
//!   ↓
//! 1. Load the item (visible to the actor, else NotFound)
//!   ↓
//! 2. Validate input and plan the mutation (pure, no IO)
//!   ↓
//! 3. Commit item write + ledger entry atomically
//! ```
//!
//! Permission checks belong to the caller (the HTTP layer); this module only
//! applies ownership and ledger scoping.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use stockledger_core::{CategoryId, ItemId, UserId};
use stockledger_inventory::{
    Category, CategoryForm, ItemForm, LedgerScope, MOST_SOLD_LIMIT, MostSoldRow, MovementEntry,
    Mutation, Page, StockAdjustment, ValidItem, ValidationErrors, low_stock, low_stock_message,
    matches_filter, paginate, plan_create, plan_decrease, plan_delete, plan_edit, plan_increase,
};

use crate::store::{InventoryStore, ListedItem, StoreError};

/// Listing knobs that come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSettings {
    /// Items at or below this quantity are flagged as low on stock.
    pub low_stock_threshold: i64,
    pub page_size: usize,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
            page_size: 15,
        }
    }
}

/// Who is performing an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub superuser: bool,
}

impl Actor {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            superuser: false,
        }
    }

    pub fn superuser(user_id: UserId) -> Self {
        Self {
            user_id,
            superuser: true,
        }
    }

    pub fn ledger_scope(&self) -> LedgerScope {
        LedgerScope::for_principal(self.user_id, self.superuser)
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Unknown id, or an item the actor may not see.
    #[error("not found")]
    NotFound,

    /// The item changed between load and commit.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => LedgerError::Conflict(msg),
            other => LedgerError::Store(other),
        }
    }
}

impl From<ValidationErrors> for LedgerError {
    fn from(value: ValidationErrors) -> Self {
        LedgerError::Validation(value)
    }
}

/// The dashboard view: one page of the actor's items plus the low-stock banner.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub page: Page<ListedItem>,
    pub filter: Option<String>,
    /// Low-stock items among all of the actor's items, not just this page.
    pub low_stock_ids: Vec<ItemId>,
    pub low_stock_count: usize,
    pub warning: Option<String>,
}

/// Result of the name filter.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFilterView {
    pub items: Vec<ListedItem>,
    pub name: Option<String>,
    pub low_stock_ids: Vec<ItemId>,
}

pub struct LedgerService<S> {
    store: S,
    settings: ListingSettings,
}

impl<S> LedgerService<S>
where
    S: InventoryStore,
{
    pub fn new(store: S, settings: ListingSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> ListingSettings {
        self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load_item(&self, actor: Actor, id: ItemId) -> Result<ListedItem, LedgerError> {
        match self.store.get_item(id).await? {
            Some(listed) if listed.item.is_visible_to(actor.user_id, actor.superuser) => Ok(listed),
            _ => Err(LedgerError::NotFound),
        }
    }

    /// Validate the form and resolve its category in one pass so the caller
    /// sees every field error at once.
    async fn validate_item(&self, form: ItemForm) -> Result<ValidItem, LedgerError> {
        let mut errors = ValidationErrors::new();
        if let Some(id) = form.category_id {
            if self.store.get_category(id).await?.is_none() {
                errors.add("category_id", "select a valid choice");
            }
        }

        match form.validate() {
            Ok(valid) if errors.is_empty() => Ok(valid),
            Ok(_) => Err(errors.into()),
            Err(mut form_errors) => {
                form_errors.merge(errors);
                Err(form_errors.into())
            }
        }
    }

    async fn commit(&self, mutation: &Mutation) -> Result<(), LedgerError> {
        self.store.commit(mutation).await?;
        info!(
            item_id = %mutation.write.item_id(),
            action = %mutation.entry.action,
            change = mutation.entry.change,
            "movement recorded"
        );
        Ok(())
    }

    #[instrument(skip(self, form), fields(user_id = %actor.user_id))]
    pub async fn create_item(
        &self,
        actor: Actor,
        form: ItemForm,
    ) -> Result<ListedItem, LedgerError> {
        let valid = self.validate_item(form).await?;
        let mutation = plan_create(actor.user_id, valid, Utc::now());
        self.commit(&mutation).await?;
        self.load_item(actor, mutation.write.item_id()).await
    }

    #[instrument(skip(self, form), fields(user_id = %actor.user_id))]
    pub async fn edit_item(
        &self,
        actor: Actor,
        id: ItemId,
        form: ItemForm,
    ) -> Result<ListedItem, LedgerError> {
        let current = self.load_item(actor, id).await?;
        let valid = self.validate_item(form).await?;
        let mutation = plan_edit(&current.item, valid, actor.user_id, Utc::now())?;
        self.commit(&mutation).await?;
        self.load_item(actor, id).await
    }

    #[instrument(skip(self, adjustment), fields(user_id = %actor.user_id))]
    pub async fn increase(
        &self,
        actor: Actor,
        id: ItemId,
        adjustment: StockAdjustment,
    ) -> Result<ListedItem, LedgerError> {
        let current = self.load_item(actor, id).await?;
        let mutation = plan_increase(&current.item, adjustment, actor.user_id, Utc::now())?;
        self.commit(&mutation).await?;
        self.load_item(actor, id).await
    }

    #[instrument(skip(self, adjustment), fields(user_id = %actor.user_id))]
    pub async fn decrease(
        &self,
        actor: Actor,
        id: ItemId,
        adjustment: StockAdjustment,
    ) -> Result<ListedItem, LedgerError> {
        let current = self.load_item(actor, id).await?;
        let mutation = plan_decrease(&current.item, adjustment, actor.user_id, Utc::now())?;
        self.commit(&mutation).await?;
        self.load_item(actor, id).await
    }

    /// Delete the item; returns the REMOVE entry that closed its ledger.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn delete_item(
        &self,
        actor: Actor,
        id: ItemId,
    ) -> Result<MovementEntry, LedgerError> {
        let current = self.load_item(actor, id).await?;
        let mutation = plan_delete(&current.item, actor.user_id, Utc::now())?;
        self.commit(&mutation).await?;
        let mut entry = mutation.entry;
        entry.item_id = None;
        Ok(entry)
    }

    pub async fn get_item(&self, actor: Actor, id: ItemId) -> Result<ListedItem, LedgerError> {
        self.load_item(actor, id).await
    }

    /// The actor's own items, filtered by item or category name and paginated.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn dashboard(
        &self,
        actor: Actor,
        filter: Option<&str>,
        page: Option<&str>,
    ) -> Result<Dashboard, LedgerError> {
        let items = self.store.list_items(actor.user_id).await?;
        let filter = non_blank(filter);

        let low_stock_ids = low_stock(
            items.iter().map(|l| &l.item),
            self.settings.low_stock_threshold,
        );
        let low_stock_count = low_stock_ids.len();

        let shown: Vec<ListedItem> = match &filter {
            Some(needle) => items
                .into_iter()
                .filter(|l| matches_filter(&l.item, l.category_name.as_deref(), needle))
                .collect(),
            None => items,
        };

        Ok(Dashboard {
            page: paginate(shown, self.settings.page_size, page),
            filter,
            low_stock_ids,
            low_stock_count,
            warning: low_stock_message(low_stock_count),
        })
    }

    /// The actor's items whose name contains `name` (case-insensitive).
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn filter_items(
        &self,
        actor: Actor,
        name: Option<&str>,
    ) -> Result<ItemFilterView, LedgerError> {
        let name = non_blank(name);
        let items: Vec<ListedItem> = self
            .store
            .list_items(actor.user_id)
            .await?
            .into_iter()
            .filter(|l| match &name {
                Some(needle) => matches_filter(&l.item, None, needle),
                None => true,
            })
            .collect();

        let low_stock_ids = low_stock(
            items.iter().map(|l| &l.item),
            self.settings.low_stock_threshold,
        );
        Ok(ItemFilterView {
            items,
            name,
            low_stock_ids,
        })
    }

    pub async fn movement_log(&self, actor: Actor) -> Result<Vec<MovementEntry>, LedgerError> {
        Ok(self.store.list_movements(actor.ledger_scope()).await?)
    }

    /// Superusers clear the whole ledger, everyone else only their own entries.
    #[instrument(skip(self), fields(user_id = %actor.user_id, superuser = actor.superuser))]
    pub async fn clear_logs(&self, actor: Actor) -> Result<u64, LedgerError> {
        let removed = self.store.clear_movements(actor.ledger_scope()).await?;
        info!(removed, "movement log cleared");
        Ok(removed)
    }

    pub async fn most_sold(&self, actor: Actor) -> Result<Vec<MostSoldRow>, LedgerError> {
        Ok(self.store.most_sold(actor.ledger_scope(), MOST_SOLD_LIMIT).await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, LedgerError> {
        Ok(self.store.list_categories().await?)
    }

    #[instrument(skip(self, form))]
    pub async fn create_category(&self, form: CategoryForm) -> Result<Category, LedgerError> {
        let valid = form.validate()?;
        let category = Category {
            id: CategoryId::new(),
            name: valid.name,
        };
        self.store.insert_category(&category).await?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), LedgerError> {
        if !self.store.delete_category(id).await? {
            return Err(LedgerError::NotFound);
        }
        info!(category_id = %id, "category deleted");
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
