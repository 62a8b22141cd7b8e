use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockledger_core::{CategoryId, ItemId, UserId};
use stockledger_inventory::{
    Category, Item, ItemWrite, LedgerScope, MostSoldRow, MovementEntry, Mutation, most_sold,
};

use super::{InventoryStore, ListedItem, StoreError, expected_prior_quantity};

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemId, Item>,
    categories: HashMap<CategoryId, Category>,
    /// Append order doubles as the tie-break for equal timestamps.
    movements: Vec<MovementEntry>,
}

impl State {
    fn listed(&self, item: &Item) -> ListedItem {
        ListedItem {
            item: item.clone(),
            category_name: item
                .category_id
                .and_then(|id| self.categories.get(&id))
                .map(|c| c.name.clone()),
        }
    }

    fn check_prior(&self, id: ItemId, expected: i64) -> Result<(), StoreError> {
        match self.items.get(&id) {
            Some(current) if current.quantity == expected => Ok(()),
            Some(current) => Err(StoreError::Conflict(format!(
                "item {id} quantity is {}, mutation expected {expected}",
                current.quantity
            ))),
            None => Err(StoreError::Conflict(format!("item {id} no longer exists"))),
        }
    }
}

/// In-memory inventory store for tests/dev.
///
/// Every operation runs inside one lock critical section, which makes
/// [`InventoryStore::commit`] atomic.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    inner: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_item(&self, id: ItemId) -> Result<Option<ListedItem>, StoreError> {
        let state = self.read()?;
        Ok(state.items.get(&id).map(|item| state.listed(item)))
    }

    async fn list_items(&self, owner: UserId) -> Result<Vec<ListedItem>, StoreError> {
        let state = self.read()?;
        let mut items: Vec<&Item> = state.items.values().filter(|i| i.owner == owner).collect();
        items.sort_by_key(|i| (i.created_at, i.id));
        Ok(items.into_iter().map(|i| state.listed(i)).collect())
    }

    async fn commit(&self, mutation: &Mutation) -> Result<(), StoreError> {
        let mut state = self.write()?;

        // Validate first so a rejected mutation leaves no trace.
        match &mutation.write {
            ItemWrite::Insert(item) => {
                if state.items.contains_key(&item.id) {
                    return Err(StoreError::Conflict(format!("item {} already exists", item.id)));
                }
            }
            ItemWrite::Update(item) => {
                state.check_prior(item.id, expected_prior_quantity(mutation)?)?
            }
            ItemWrite::Delete(id) => state.check_prior(*id, expected_prior_quantity(mutation)?)?,
        }

        state.movements.push(mutation.entry.clone());
        match &mutation.write {
            ItemWrite::Insert(item) | ItemWrite::Update(item) => {
                state.items.insert(item.id, item.clone());
            }
            ItemWrite::Delete(id) => {
                state.items.remove(id);
                for entry in state.movements.iter_mut().filter(|e| e.item_id == Some(*id)) {
                    entry.item_id = None;
                }
            }
        }
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.read()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        self.write()?.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for item in state.items.values_mut().filter(|i| i.category_id == Some(id)) {
            item.category_id = None;
        }
        Ok(true)
    }

    async fn list_movements(&self, scope: LedgerScope) -> Result<Vec<MovementEntry>, StoreError> {
        let state = self.read()?;
        let mut entries: Vec<MovementEntry> = state
            .movements
            .iter()
            .rev()
            .filter(|e| scope.includes(e))
            .cloned()
            .collect();
        // Stable: equal timestamps keep newest-appended first.
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    async fn clear_movements(&self, scope: LedgerScope) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        let before = state.movements.len();
        state.movements.retain(|e| !scope.includes(e));
        Ok((before - state.movements.len()) as u64)
    }

    async fn most_sold(
        &self,
        scope: LedgerScope,
        limit: usize,
    ) -> Result<Vec<MostSoldRow>, StoreError> {
        let state = self.read()?;
        let items = &state.items;
        Ok(most_sold(
            state.movements.iter().filter(|e| scope.includes(e)),
            move |id| items.get(&id).map(|item| item.name.as_str()),
            limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockledger_inventory::{
        StockAdjustment, ValidItem, plan_create, plan_decrease, plan_delete,
    };

    fn valid(name: &str, quantity: i64, category_id: Option<CategoryId>) -> ValidItem {
        ValidItem {
            name: name.to_string(),
            quantity,
            category_id,
        }
    }

    #[tokio::test]
    async fn delete_nulls_item_reference_on_prior_entries() {
        let store = InMemoryInventoryStore::new();
        let owner = UserId::new();

        let created = plan_create(owner, valid("BOLT", 10, None), Utc::now());
        store.commit(&created).await.unwrap();
        let item = created.item().unwrap().clone();

        store.commit(&plan_delete(&item, owner, Utc::now()).unwrap()).await.unwrap();

        assert!(store.get_item(item.id).await.unwrap().is_none());
        let entries = store.list_movements(LedgerScope::All).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.item_id.is_none()));
        assert!(entries.iter().all(|e| e.item_name == "BOLT"));
    }

    #[tokio::test]
    async fn stale_mutation_is_rejected_without_writing() {
        let store = InMemoryInventoryStore::new();
        let owner = UserId::new();

        let created = plan_create(owner, valid("NUT", 10, None), Utc::now());
        store.commit(&created).await.unwrap();
        let stale = created.item().unwrap().clone();

        let adjustment = StockAdjustment {
            quantity: Some(2),
            observation: None,
        };
        let first = plan_decrease(&stale, adjustment.clone(), owner, Utc::now()).unwrap();
        let second = plan_decrease(&stale, adjustment, owner, Utc::now()).unwrap();
        store.commit(&first).await.unwrap();

        let err = store.commit(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get_item(stale.id).await.unwrap().unwrap().item.quantity, 8);
        assert_eq!(store.list_movements(LedgerScope::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mutation_with_irreversible_change_is_a_conflict() {
        let store = InMemoryInventoryStore::new();
        let owner = UserId::new();

        let created = plan_create(owner, valid("NUT", 1, None), Utc::now());
        store.commit(&created).await.unwrap();

        let mut forged = plan_decrease(
            created.item().unwrap(),
            StockAdjustment {
                quantity: Some(1),
                observation: None,
            },
            owner,
            Utc::now(),
        )
        .unwrap();
        forged.entry.change = 1;
        if let ItemWrite::Update(item) = &mut forged.write {
            item.quantity = i64::MIN;
        }

        let err = store.commit(&forged).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let id = created.item().unwrap().id;
        assert_eq!(store.get_item(id).await.unwrap().unwrap().item.quantity, 1);
        assert_eq!(store.list_movements(LedgerScope::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_category_nulls_item_reference() {
        let store = InMemoryInventoryStore::new();
        let owner = UserId::new();
        let category = Category {
            id: CategoryId::new(),
            name: "Fasteners".to_string(),
        };
        store.insert_category(&category).await.unwrap();

        let created = plan_create(owner, valid("BOLT", 1, Some(category.id)), Utc::now());
        store.commit(&created).await.unwrap();
        let id = created.item().unwrap().id;
        let listed = store.get_item(id).await.unwrap().unwrap();
        assert_eq!(listed.category_name.as_deref(), Some("Fasteners"));

        assert!(store.delete_category(category.id).await.unwrap());
        assert!(!store.delete_category(category.id).await.unwrap());

        let listed = store.get_item(id).await.unwrap().unwrap();
        assert_eq!(listed.item.category_id, None);
        assert_eq!(listed.category_name, None);
    }

    #[tokio::test]
    async fn clear_respects_scope() {
        let store = InMemoryInventoryStore::new();
        let alice = UserId::new();
        let bob = UserId::new();

        store.commit(&plan_create(alice, valid("A", 1, None), Utc::now())).await.unwrap();
        store.commit(&plan_create(bob, valid("B", 1, None), Utc::now())).await.unwrap();

        assert_eq!(store.clear_movements(LedgerScope::User(alice)).await.unwrap(), 1);
        let remaining = store.list_movements(LedgerScope::All).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, Some(bob));

        assert_eq!(store.clear_movements(LedgerScope::All).await.unwrap(), 1);
        assert!(store.list_movements(LedgerScope::All).await.unwrap().is_empty());
    }
}
