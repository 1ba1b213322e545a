use std::collections::HashMap;

use async_trait::async_trait;
use tavola_catalog::{CatalogRepository, MenuCatalog, MenuItem, MenuItemSnapshot, Restaurant};
use tavola_core::{StoreError, StoreResult};
use tavola_order::{Order, OrderRepository, OrderStatus, StatusTally};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    restaurants: HashMap<Uuid, Restaurant>,
    menu_items: HashMap<Uuid, MenuItem>,
    orders: HashMap<Uuid, Order>,
}

/// Process-local store enforcing the same constraints as the PostgreSQL
/// schema. One write lock per mutation stands in for a transaction.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn check_restaurant_name(&self, restaurant: &Restaurant) -> StoreResult<()> {
        let taken = self
            .restaurants
            .values()
            .any(|r| r.id != restaurant.id && r.name == restaurant.name);
        if taken {
            return Err(StoreError::UniqueViolation(format!("restaurants.name = '{}'", restaurant.name)));
        }
        Ok(())
    }

    fn check_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        if !self.restaurants.contains_key(&item.restaurant_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "menu_items.restaurant_id = {}",
                item.restaurant_id
            )));
        }
        let taken = self
            .menu_items
            .values()
            .any(|m| m.id != item.id && m.restaurant_id == item.restaurant_id && m.name == item.name);
        if taken {
            return Err(StoreError::UniqueViolation(format!(
                "menu_items (restaurant_id, name) = ({}, '{}')",
                item.restaurant_id, item.name
            )));
        }
        Ok(())
    }

    fn check_order(&self, order: &Order) -> StoreResult<()> {
        if !self.restaurants.contains_key(&order.restaurant_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "orders.restaurant_id = {}",
                order.restaurant_id
            )));
        }

        let mut seen = Vec::with_capacity(order.items().len());
        for item in order.items() {
            if item.order_id != order.id {
                return Err(StoreError::ForeignKeyViolation(format!("order_items.order_id = {}", item.order_id)));
            }
            if !self.menu_items.contains_key(&item.menu_item_id) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "order_items.menu_item_id = {}",
                    item.menu_item_id
                )));
            }
            if seen.contains(&item.menu_item_id) {
                return Err(StoreError::UniqueViolation(format!(
                    "order_items (order_id, menu_item_id) = ({}, {})",
                    order.id, item.menu_item_id
                )));
            }
            seen.push(item.menu_item_id);
        }
        Ok(())
    }

    /// Expected version of `order` must match what is stored
    fn check_version(&self, order: &Order) -> StoreResult<()> {
        match self.orders.get(&order.id) {
            Some(stored) if stored.version == order.version => Ok(()),
            Some(_) => Err(StoreError::VersionConflict {
                entity: "order",
                id: order.id,
                expected: order.version,
            }),
            None if order.version == 0 => Ok(()),
            None => Err(StoreError::NotFound { entity: "order", id: order.id }),
        }
    }

    fn put_order(&mut self, order: &Order) -> Order {
        let mut stored = order.clone();
        stored.version += 1;
        self.orders.insert(stored.id, stored.clone());
        stored
    }
}

#[async_trait]
impl MenuCatalog for InMemoryStore {
    async fn get_menu_item(&self, id: Uuid) -> StoreResult<Option<MenuItemSnapshot>> {
        let tables = self.tables.read().await;
        Ok(tables.menu_items.get(&id).map(MenuItem::snapshot))
    }

    async fn get_restaurant(&self, id: Uuid) -> StoreResult<Option<Restaurant>> {
        let tables = self.tables.read().await;
        Ok(tables.restaurants.get(&id).cloned())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn insert_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.restaurants.contains_key(&restaurant.id) {
            return Err(StoreError::UniqueViolation(format!("restaurants.id = {}", restaurant.id)));
        }
        tables.check_restaurant_name(restaurant)?;
        tables.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(())
    }

    async fn update_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.restaurants.contains_key(&restaurant.id) {
            return Err(StoreError::NotFound { entity: "restaurant", id: restaurant.id });
        }
        tables.check_restaurant_name(restaurant)?;
        tables.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(())
    }

    async fn delete_restaurant(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.restaurants.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "restaurant", id });
        }
        tables.menu_items.retain(|_, m| m.restaurant_id != id);
        tables.orders.retain(|_, o| o.restaurant_id != id);
        debug!(restaurant_id = %id, "Cascaded restaurant delete to menu items and orders");
        Ok(())
    }

    async fn insert_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.menu_items.contains_key(&item.id) {
            return Err(StoreError::UniqueViolation(format!("menu_items.id = {}", item.id)));
        }
        tables.check_menu_item(item)?;
        tables.menu_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn find_menu_item(&self, id: Uuid) -> StoreResult<Option<MenuItem>> {
        let tables = self.tables.read().await;
        Ok(tables.menu_items.get(&id).cloned())
    }

    async fn update_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.menu_items.contains_key(&item.id) {
            return Err(StoreError::NotFound { entity: "menu item", id: item.id });
        }
        tables.check_menu_item(item)?;
        tables.menu_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn delete_menu_item(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.menu_items.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "menu item", id });
        }
        for order in tables.orders.values_mut() {
            if order.purge_menu_item(id) {
                order.version += 1;
                debug!(order_id = %order.id, menu_item_id = %id, "Cascaded menu item delete to order");
            }
        }
        Ok(())
    }

    async fn list_menu_items(&self, restaurant_id: Uuid, available_only: bool) -> StoreResult<Vec<MenuItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<MenuItem> = tables
            .menu_items
            .values()
            .filter(|m| m.restaurant_id == restaurant_id && (!available_only || m.is_available))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn find_by_restaurant(&self, restaurant_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.restaurant_id == restaurant_id && status.map_or(true, |s| o.status() == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn save(&self, order: &Order) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        tables.check_version(order)?;
        tables.check_order(order)?;
        Ok(tables.put_order(order))
    }

    async fn delete_line_item(&self, order: &Order, item_id: Uuid) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        tables.check_version(order)?;

        let stored_has_item = tables
            .orders
            .get(&order.id)
            .map_or(false, |stored| stored.item(item_id).is_some());
        if !stored_has_item {
            return Err(StoreError::NotFound { entity: "order item", id: item_id });
        }
        if order.item(item_id).is_some() {
            return Err(StoreError::Backend(format!("order item {} still present in the written order", item_id)));
        }

        tables.check_order(order)?;
        Ok(tables.put_order(order))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { entity: "order", id })
    }

    async fn status_tallies(&self, restaurant_id: Option<Uuid>) -> StoreResult<Vec<StatusTally>> {
        let tables = self.tables.read().await;
        let mut tallies: Vec<StatusTally> = Vec::new();

        for order in tables
            .orders
            .values()
            .filter(|o| restaurant_id.map_or(true, |id| o.restaurant_id == id))
        {
            match tallies.iter_mut().find(|t| t.status == order.status()) {
                Some(tally) => {
                    tally.count += 1;
                    tally.total_amount += order.total_amount();
                }
                None => tallies.push(StatusTally {
                    status: order.status(),
                    count: 1,
                    total_amount: order.total_amount(),
                }),
            }
        }
        Ok(tallies)
    }
}
