//! Infrastructure wiring: picks the store backend and builds the ledger service.

use std::sync::Arc;

use anyhow::Context;

use stockledger_infra::{
    InMemoryInventoryStore, InventoryStore, LedgerService, ListingSettings, PostgresInventoryStore,
};

use crate::config::ApiConfig;

pub type DynStore = Arc<dyn InventoryStore>;

/// Shared application services, injected into handlers as an `Extension`.
pub struct AppServices {
    ledger: LedgerService<DynStore>,
}

impl AppServices {
    pub fn new(store: DynStore, listing: ListingSettings) -> Self {
        Self {
            ledger: LedgerService::new(store, listing),
        }
    }

    pub fn in_memory(listing: ListingSettings) -> Self {
        Self::new(Arc::new(InMemoryInventoryStore::new()), listing)
    }

    pub fn ledger(&self) -> &LedgerService<DynStore> {
        &self.ledger
    }
}

/// Postgres when `DATABASE_URL` is configured, in-memory otherwise.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresInventoryStore::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            tracing::info!("using postgres inventory store");
            Ok(AppServices::new(Arc::new(store), config.listing))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory inventory store");
            Ok(AppServices::in_memory(config.listing))
        }
    }
}
