//! Infrastructure layer: persistence backends and the ledger service that
//! runs every inventory handler against them.

pub mod ledger_service;
pub mod store;


pub use ledger_service::{
    Actor, Dashboard, ItemFilterView, LedgerError, LedgerService, ListingSettings,
};
pub use store::{
    InMemoryInventoryStore, InventoryStore, ListedItem, PostgresInventoryStore, StoreError,
};
