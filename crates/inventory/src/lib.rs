//! Inventory domain module.
//!
//! Items, categories and the stock-movement ledger, implemented as
//! deterministic domain logic (no IO, no HTTP, no storage). Handlers turn a
//! request into a [`Mutation`]: the item write plus the ledger entry that
//! describes it. Storage commits both together.

pub mod item;
pub mod listing;
pub mod movement;
pub mod mutation;
pub mod report;
pub mod validation;

pub use item::{
    Category, CategoryForm, Item, ItemForm, QUANTITY_MAX, QUANTITY_MIN, ValidCategory, ValidItem,
};
pub use listing::{Page, low_stock, low_stock_message, matches_filter, paginate};
pub use movement::{Direction, LedgerScope, MovementAction, MovementEntry};
pub use mutation::{
    ItemWrite, Mutation, StockAdjustment, plan_create, plan_decrease, plan_delete, plan_edit,
    plan_increase,
};
pub use report::{MOST_SOLD_LIMIT, MostSoldRow, most_sold};
pub use validation::ValidationErrors;
