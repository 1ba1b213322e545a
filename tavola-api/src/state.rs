use std::sync::Arc;

use tavola_catalog::{CatalogRepository, CatalogService, MenuCatalog};
use tavola_order::{OrderManager, OrderRepository};
use tavola_store::{DbClient, InMemoryStore, PgCatalogRepository, PgOrderRepository};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderManager>,
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    /// Everything in one process-local store; nothing survives a restart
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let catalog_repo: Arc<dyn CatalogRepository> = store.clone();
        let menu: Arc<dyn MenuCatalog> = store.clone();
        let order_repo: Arc<dyn OrderRepository> = store;

        Self::from_parts(catalog_repo, menu, order_repo)
    }

    pub fn postgres(db: &DbClient) -> Self {
        let catalog = Arc::new(PgCatalogRepository::new(db.pool.clone()));
        let catalog_repo: Arc<dyn CatalogRepository> = catalog.clone();
        let menu: Arc<dyn MenuCatalog> = catalog;
        let order_repo: Arc<dyn OrderRepository> = Arc::new(PgOrderRepository::new(db.pool.clone()));

        Self::from_parts(catalog_repo, menu, order_repo)
    }

    fn from_parts(
        catalog_repo: Arc<dyn CatalogRepository>,
        menu: Arc<dyn MenuCatalog>,
        order_repo: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            orders: Arc::new(OrderManager::new(order_repo, menu)),
            catalog: Arc::new(CatalogService::new(catalog_repo)),
        }
    }
}
