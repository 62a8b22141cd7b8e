//! Postgres-backed inventory store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Conflict` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed | N/A | `Unavailable` |
//! | Other | N/A | `Database` |
//!
//! A guarded update or delete that matches no row is also a `Conflict`: the
//! item's quantity moved (or the item vanished) after the mutation was planned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use stockledger_core::{CategoryId, ItemId, MovementId, UserId};
use stockledger_inventory::{
    Category, Item, ItemWrite, LedgerScope, MostSoldRow, MovementAction, MovementEntry, Mutation,
};

use super::{InventoryStore, ListedItem, StoreError, expected_prior_quantity};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const ITEM_COLUMNS: &str = r#"
    i.id, i.name, i.quantity, i.category_id, i.owner_id, i.created_at,
    c.name AS category_name
"#;

const MOVEMENT_COLUMNS: &str = r#"
    id, item_id, item_name, change, action_type, occurred_at, user_id, observation
"#;

/// Postgres-backed inventory store.
///
/// `commit()` runs the item write and the ledger insert in one transaction.
/// Updates and deletes carry `quantity = <expected>` in their WHERE clause, so
/// a concurrent change to the same item makes them match zero rows and the
/// whole transaction is rolled back.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and create the schema if it does not exist yet.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn insert_entry(
        tx: &mut Transaction<'_, Postgres>,
        entry: &MovementEntry,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO movement_log (
                id, item_id, item_name, change, action_type, occurred_at, user_id, observation
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::from(entry.id))
        .bind(entry.item_id.map(Uuid::from))
        .bind(&entry.item_name)
        .bind(entry.change)
        .bind(entry.action.as_str())
        .bind(entry.timestamp)
        .bind(entry.user_id.map(Uuid::from))
        .bind(&entry.observation)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;
        Ok(())
    }

    async fn abort(tx: Transaction<'_, Postgres>, message: String) -> Result<(), StoreError> {
        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))?;
        Err(StoreError::Conflict(message))
    }
}

#[async_trait::async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self), err)]
    async fn get_item(&self, id: ItemId) -> Result<Option<ListedItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items i LEFT JOIN categories c ON c.id = i.category_id WHERE i.id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        row.as_ref().map(listed_item_from_row).transpose()
    }

    #[instrument(skip(self), fields(item_count = tracing::field::Empty), err)]
    async fn list_items(&self, owner: UserId) -> Result<Vec<ListedItem>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM items i
            LEFT JOIN categories c ON c.id = i.category_id
            WHERE i.owner_id = $1
            ORDER BY i.created_at ASC, i.id ASC
            "#
        ))
        .bind(Uuid::from(owner))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        Span::current().record("item_count", rows.len());
        rows.iter().map(listed_item_from_row).collect()
    }

    #[instrument(
        skip(self, mutation),
        fields(
            item_id = %mutation.write.item_id(),
            action = %mutation.entry.action,
            change = mutation.entry.change
        ),
        err
    )]
    async fn commit(&self, mutation: &Mutation) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        match &mutation.write {
            ItemWrite::Insert(item) => {
                sqlx::query(
                    r#"
                    INSERT INTO items (id, name, quantity, category_id, owner_id, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(Uuid::from(item.id))
                .bind(&item.name)
                .bind(item.quantity)
                .bind(item.category_id.map(Uuid::from))
                .bind(Uuid::from(item.owner))
                .bind(item.created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_item", e))?;

                Self::insert_entry(&mut tx, &mutation.entry).await?;
            }
            ItemWrite::Update(item) => {
                let expected = expected_prior_quantity(mutation)?;
                let updated = sqlx::query(
                    r#"
                    UPDATE items
                    SET name = $2, quantity = $3, category_id = $4
                    WHERE id = $1 AND quantity = $5
                    "#,
                )
                .bind(Uuid::from(item.id))
                .bind(&item.name)
                .bind(item.quantity)
                .bind(item.category_id.map(Uuid::from))
                .bind(expected)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_item", e))?;

                if updated.rows_affected() == 0 {
                    return Self::abort(
                        tx,
                        format!("item {} no longer has quantity {expected}", item.id),
                    )
                    .await;
                }
                Self::insert_entry(&mut tx, &mutation.entry).await?;
            }
            ItemWrite::Delete(id) => {
                let expected = expected_prior_quantity(mutation)?;
                // Entry first: the cascade below nulls its item_id with the rest.
                Self::insert_entry(&mut tx, &mutation.entry).await?;

                let deleted = sqlx::query("DELETE FROM items WHERE id = $1 AND quantity = $2")
                    .bind(Uuid::from(*id))
                    .bind(expected)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("delete_item", e))?;

                if deleted.rows_affected() == 0 {
                    return Self::abort(tx, format!("item {id} no longer has quantity {expected}"))
                        .await;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;

        row.as_ref().map(category_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name ASC, id ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;

        rows.iter().map(category_from_row).collect()
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
            .bind(Uuid::from(category.id))
            .bind(&category.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(entry_count = tracing::field::Empty), err)]
    async fn list_movements(&self, scope: LedgerScope) -> Result<Vec<MovementEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movement_log
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY occurred_at DESC, seq DESC
            "#
        ))
        .bind(scope_user(scope))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        Span::current().record("entry_count", rows.len());
        rows.iter().map(movement_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn clear_movements(&self, scope: LedgerScope) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM movement_log WHERE ($1::uuid IS NULL OR user_id = $1)")
                .bind(scope_user(scope))
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("clear_movements", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn most_sold(
        &self,
        scope: LedgerScope,
        limit: usize,
    ) -> Result<Vec<MostSoldRow>, StoreError> {
        // Live items group by id under their current name; deleted items
        // (item_id nulled) group by the name snapshot.
        let rows = sqlx::query(
            r#"
            SELECT
                m.item_id,
                COALESCE(MAX(i.name), MAX(m.item_name)) AS item_name,
                SUM(m.change)::BIGINT AS total_change
            FROM movement_log m
            LEFT JOIN items i ON i.id = m.item_id
            WHERE m.change < 0 AND ($1::uuid IS NULL OR m.user_id = $1)
            GROUP BY m.item_id, CASE WHEN m.item_id IS NULL THEN m.item_name END
            ORDER BY total_change ASC, item_name ASC
            LIMIT $2
            "#,
        )
        .bind(scope_user(scope))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("most_sold", e))?;

        rows.iter()
            .map(|row| {
                Ok(MostSoldRow {
                    item_id: row
                        .try_get::<Option<Uuid>, _>("item_id")
                        .map_err(corrupt)?
                        .map(ItemId::from_uuid),
                    item_name: row.try_get("item_name").map_err(corrupt)?,
                    total_change: row.try_get("total_change").map_err(corrupt)?,
                })
            })
            .collect()
    }
}

fn scope_user(scope: LedgerScope) -> Option<Uuid> {
    match scope {
        LedgerScope::All => None,
        LedgerScope::User(user) => Some(Uuid::from(user)),
    }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn listed_item_from_row(row: &PgRow) -> Result<ListedItem, StoreError> {
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(corrupt)?;
    Ok(ListedItem {
        item: Item {
            id: ItemId::from_uuid(row.try_get("id").map_err(corrupt)?),
            name: row.try_get("name").map_err(corrupt)?,
            quantity: row.try_get("quantity").map_err(corrupt)?,
            category_id: row
                .try_get::<Option<Uuid>, _>("category_id")
                .map_err(corrupt)?
                .map(CategoryId::from_uuid),
            owner: UserId::from_uuid(row.try_get("owner_id").map_err(corrupt)?),
            created_at,
        },
        category_name: row.try_get("category_name").map_err(corrupt)?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, StoreError> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id").map_err(corrupt)?),
        name: row.try_get("name").map_err(corrupt)?,
    })
}

fn movement_from_row(row: &PgRow) -> Result<MovementEntry, StoreError> {
    let action: String = row.try_get("action_type").map_err(corrupt)?;
    let action: MovementAction = action
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("movement_log.action_type: {e}")))?;

    Ok(MovementEntry {
        id: MovementId::from_uuid(row.try_get("id").map_err(corrupt)?),
        item_id: row
            .try_get::<Option<Uuid>, _>("item_id")
            .map_err(corrupt)?
            .map(ItemId::from_uuid),
        item_name: row.try_get("item_name").map_err(corrupt)?,
        change: row.try_get("change").map_err(corrupt)?,
        action,
        timestamp: row.try_get("occurred_at").map_err(corrupt)?,
        user_id: row
            .try_get::<Option<Uuid>, _>("user_id")
            .map_err(corrupt)?
            .map(UserId::from_uuid),
        observation: row.try_get("observation").map_err(corrupt)?,
    })
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                // Unique violation: duplicate id.
                Some("23505") => StoreError::Conflict(format!("{operation}: {message}")),
                // Foreign key violation: referenced category was deleted meanwhile.
                Some("23503") => StoreError::Conflict(format!("{operation}: {message}")),
                _ => StoreError::Database { operation, message },
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}

/// Runs against a live database when `DATABASE_URL` is set; skipped otherwise.
///
/// The scenarios share one connection pool and run in sequence so the
/// idempotent schema creation happens once. Each scenario uses fresh owners,
/// which keeps them isolated from each other and from earlier runs.
#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_inventory::{
        StockAdjustment, ValidItem, plan_create, plan_decrease, plan_delete, plan_edit,
    };

    fn valid(name: &str, quantity: i64, category_id: Option<CategoryId>) -> ValidItem {
        ValidItem {
            name: name.to_string(),
            quantity,
            category_id,
        }
    }

    fn by(quantity: i64) -> StockAdjustment {
        StockAdjustment {
            quantity: Some(quantity),
            observation: None,
        }
    }

    #[tokio::test]
    async fn postgres_store_scenarios() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping postgres store tests");
            return;
        };
        let store = PostgresInventoryStore::connect(&url).await.unwrap();

        category_names_up_to_the_form_limit_fit(&store).await;
        delete_nulls_item_reference_on_every_entry(&store).await;
        stale_mutation_is_rejected_without_writing(&store).await;
        most_sold_groups_live_and_deleted_items(&store).await;
    }

    async fn category_names_up_to_the_form_limit_fit(store: &PostgresInventoryStore) {
        let category = Category {
            id: CategoryId::new(),
            name: "c".repeat(stockledger_inventory::item::NAME_MAX_CHARS),
        };
        store.insert_category(&category).await.unwrap();
        assert_eq!(store.get_category(category.id).await.unwrap(), Some(category.clone()));
        assert!(store.delete_category(category.id).await.unwrap());
    }

    async fn delete_nulls_item_reference_on_every_entry(store: &PostgresInventoryStore) {
        let owner = UserId::new();
        let created = plan_create(owner, valid("BOLT", 10, None), Utc::now());
        store.commit(&created).await.unwrap();
        let item = created.item().unwrap().clone();

        let decreased = plan_decrease(&item, by(3), owner, Utc::now()).unwrap();
        store.commit(&decreased).await.unwrap();
        let item = decreased.item().unwrap().clone();

        store.commit(&plan_delete(&item, owner, Utc::now()).unwrap()).await.unwrap();

        assert!(store.get_item(item.id).await.unwrap().is_none());
        let entries = store.list_movements(LedgerScope::User(owner)).await.unwrap();
        let changes: Vec<_> = entries.iter().map(|e| (e.action, e.change)).collect();
        assert_eq!(
            changes,
            vec![
                (MovementAction::Remove, -7),
                (MovementAction::Decrease, -3),
                (MovementAction::Add, 10),
            ]
        );
        assert!(entries.iter().all(|e| e.item_id.is_none() && e.item_name == "BOLT"));
    }

    async fn stale_mutation_is_rejected_without_writing(store: &PostgresInventoryStore) {
        let owner = UserId::new();
        let created = plan_create(owner, valid("NUT", 10, None), Utc::now());
        store.commit(&created).await.unwrap();
        let stale = created.item().unwrap().clone();

        let first = plan_decrease(&stale, by(2), owner, Utc::now()).unwrap();
        let second = plan_decrease(&stale, by(2), owner, Utc::now()).unwrap();
        store.commit(&first).await.unwrap();

        let err = store.commit(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let err = store
            .commit(&plan_delete(&stale, owner, Utc::now()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        assert_eq!(store.get_item(stale.id).await.unwrap().unwrap().item.quantity, 8);
        assert_eq!(store.list_movements(LedgerScope::User(owner)).await.unwrap().len(), 2);
    }

    async fn most_sold_groups_live_and_deleted_items(store: &PostgresInventoryStore) {
        let owner = UserId::new();
        let scope = LedgerScope::User(owner);

        let nut = plan_create(owner, valid("NUT", 10, None), Utc::now());
        store.commit(&nut).await.unwrap();
        let decreased = plan_decrease(nut.item().unwrap(), by(3), owner, Utc::now()).unwrap();
        store.commit(&decreased).await.unwrap();
        let renamed = plan_edit(
            decreased.item().unwrap(),
            valid("WING NUT", 7, None),
            owner,
            Utc::now(),
        )
        .unwrap();
        store.commit(&renamed).await.unwrap();

        let gear = plan_create(owner, valid("GEAR", 5, None), Utc::now());
        store.commit(&gear).await.unwrap();
        store
            .commit(&plan_delete(gear.item().unwrap(), owner, Utc::now()).unwrap())
            .await
            .unwrap();

        let rows = store.most_sold(scope, 10).await.unwrap();
        let ranked: Vec<_> = rows
            .iter()
            .map(|r| (r.item_id, r.item_name.as_str(), r.total_change))
            .collect();
        assert_eq!(
            ranked,
            vec![
                (None, "GEAR", -5),
                (Some(nut.item().unwrap().id), "WING NUT", -3),
            ]
        );
    }
}
