use async_trait::async_trait;
use tavola_core::StoreResult;
use uuid::Uuid;

use crate::menu::{MenuItem, MenuItemSnapshot, Restaurant};

/// Read access to the catalog needed by the order aggregate
#[async_trait]
pub trait MenuCatalog: Send + Sync {
    async fn get_menu_item(&self, id: Uuid) -> StoreResult<Option<MenuItemSnapshot>>;

    async fn get_restaurant(&self, id: Uuid) -> StoreResult<Option<Restaurant>>;
}

/// Durable storage for restaurants and their menus.
///
/// Implementations enforce unique restaurant names, unique menu item names
/// within a restaurant, and cascade deletes: removing a restaurant removes its
/// menu items and orders, removing a menu item removes the order lines that
/// reference it (recomputing the affected order totals).
#[async_trait]
pub trait CatalogRepository: MenuCatalog {
    async fn insert_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()>;

    async fn update_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()>;

    async fn delete_restaurant(&self, id: Uuid) -> StoreResult<()>;

    async fn insert_menu_item(&self, item: &MenuItem) -> StoreResult<()>;

    async fn find_menu_item(&self, id: Uuid) -> StoreResult<Option<MenuItem>>;

    async fn update_menu_item(&self, item: &MenuItem) -> StoreResult<()>;

    async fn delete_menu_item(&self, id: Uuid) -> StoreResult<()>;

    /// Ordered by category, then name
    async fn list_menu_items(
        &self,
        restaurant_id: Uuid,
        available_only: bool,
    ) -> StoreResult<Vec<MenuItem>>;
}
