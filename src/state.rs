use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::store::memory::MemoryStores;
use crate::store::postgres::PgStores;
use crate::store::{
    CatalogueStore, FxStore, HoldingsLog, JobRunLog, SnapshotStore, UserPreferences,
};

/// Handles to every store the core reads or writes.
#[derive(Clone)]
pub struct AppState {
    pub catalogue: Arc<dyn CatalogueStore>,
    pub fx: Arc<dyn FxStore>,
    pub holdings: Arc<dyn HoldingsLog>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub users: Arc<dyn UserPreferences>,
    pub job_runs: Arc<dyn JobRunLog>,
}

impl AppState {
    pub fn postgres(pool: PgPool, op_timeout: Duration) -> Self {
        let stores = Arc::new(PgStores::new(pool, op_timeout));
        Self {
            catalogue: stores.clone(),
            fx: stores.clone(),
            holdings: stores.clone(),
            snapshots: stores.clone(),
            users: stores.clone(),
            job_runs: stores,
        }
    }
}

impl From<&MemoryStores> for AppState {
    fn from(stores: &MemoryStores) -> Self {
        Self {
            catalogue: stores.catalogue.clone(),
            fx: stores.fx.clone(),
            holdings: stores.holdings.clone(),
            snapshots: stores.snapshots.clone(),
            users: stores.users.clone(),
            job_runs: stores.job_runs.clone(),
        }
    }
}
