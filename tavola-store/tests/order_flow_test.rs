use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tavola_catalog::{
    CatalogError, CatalogRepository, CatalogService, MenuCatalog, MenuItem, MenuItemSnapshot, MenuItemUpdate,
    NewMenuItem, NewRestaurant, Restaurant,
};
use tavola_core::StoreResult;
use tavola_order::{
    ChangeHandler, NewLineItem, NewOrder, Order, OrderError, OrderManager, OrderRepository, OrderStatus,
    StatusTally, ValidationError,
};
use tavola_store::InMemoryStore;
use tokio::sync::Barrier;
use uuid::Uuid;

struct Harness {
    store: Arc<InMemoryStore>,
    catalog: CatalogService,
    orders: OrderManager,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let catalog_repo: Arc<dyn CatalogRepository> = store.clone();
    let menu: Arc<dyn MenuCatalog> = store.clone();
    let order_repo: Arc<dyn OrderRepository> = store.clone();

    Harness {
        catalog: CatalogService::new(catalog_repo),
        orders: OrderManager::new(order_repo, menu),
        store,
    }
}

impl Harness {
    async fn restaurant(&self, name: &str) -> Restaurant {
        self.catalog
            .create_restaurant(NewRestaurant { name: name.to_string(), description: String::new() })
            .await
            .unwrap()
    }

    async fn menu_item(&self, restaurant: &Restaurant, name: &str, price: Decimal) -> MenuItem {
        self.catalog
            .add_menu_item(
                restaurant.id,
                NewMenuItem {
                    name: name.to_string(),
                    description: None,
                    price,
                    is_available: None,
                    category: Some("Mains".to_string()),
                },
            )
            .await
            .unwrap()
    }

    async fn order(&self, restaurant: &Restaurant, lines: &[(&MenuItem, i64)]) -> Result<Order, OrderError> {
        self.orders
            .create_order(NewOrder {
                restaurant_id: restaurant.id,
                customer_name: "Ada Lovelace".to_string(),
                table_number: Some("7".to_string()),
                notes: None,
                items: lines.iter().map(|(item, quantity)| line(item.id, *quantity)).collect(),
            })
            .await
    }
}

fn line(menu_item_id: Uuid, quantity: i64) -> NewLineItem {
    NewLineItem { menu_item_id, quantity, special_instructions: None }
}

/// Order storage whose loads wait for each other, so concurrent callers all
/// read the same version before any of them writes
struct LockstepOrders {
    inner: Arc<InMemoryStore>,
    barrier: Barrier,
}

#[async_trait]
impl OrderRepository for LockstepOrders {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let order = self.inner.find_by_id(id).await?;
        self.barrier.wait().await;
        Ok(order)
    }

    async fn find_by_restaurant(&self, restaurant_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        self.inner.find_by_restaurant(restaurant_id, status).await
    }

    async fn save(&self, order: &Order) -> StoreResult<Order> {
        OrderRepository::save(self.inner.as_ref(), order).await
    }

    async fn delete_line_item(&self, order: &Order, item_id: Uuid) -> StoreResult<Order> {
        self.inner.delete_line_item(order, item_id).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        OrderRepository::delete(self.inner.as_ref(), id).await
    }

    async fn status_tallies(&self, restaurant_id: Option<Uuid>) -> StoreResult<Vec<StatusTally>> {
        self.inner.status_tallies(restaurant_id).await
    }
}

/// Menu that answers one lookup with a snapshot taken before the item was
/// deleted
struct StaleMenu {
    inner: Arc<InMemoryStore>,
    stale: Mutex<Option<MenuItemSnapshot>>,
}

#[async_trait]
impl MenuCatalog for StaleMenu {
    async fn get_menu_item(&self, id: Uuid) -> StoreResult<Option<MenuItemSnapshot>> {
        let stale = {
            let mut slot = self.stale.lock().unwrap();
            match slot.as_ref() {
                Some(snapshot) if snapshot.id == id => slot.take(),
                _ => None,
            }
        };
        match stale {
            Some(snapshot) => Ok(Some(snapshot)),
            None => self.inner.get_menu_item(id).await,
        }
    }

    async fn get_restaurant(&self, id: Uuid) -> StoreResult<Option<Restaurant>> {
        MenuCatalog::get_restaurant(self.inner.as_ref(), id).await
    }
}

#[tokio::test]
async fn test_order_lifecycle_end_to_end() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;

    let order = h.order(&r, &[(&pizza, 2)]).await.unwrap();
    assert_eq!(order.total_amount().to_string(), "31.98");
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.version, 1);

    let order = h.orders.update_status(order.id, OrderStatus::InProgress).await.unwrap();
    assert_eq!(order.status(), OrderStatus::InProgress);

    let err = h.orders.update_status(order.id, OrderStatus::Pending).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation(ValidationError::IllegalTransition {
            from: OrderStatus::InProgress,
            to: OrderStatus::Pending
        })
    ));

    let order = h.orders.update_status(order.id, OrderStatus::Done).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Done);
    assert_eq!(order.total_amount(), dec!(31.98));

    let err = h.orders.update_status(order.id, OrderStatus::Cancelled).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::IllegalTransition { .. })));
}

#[tokio::test]
async fn test_statistics_counts_and_revenue() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pasta = h.menu_item(&r, "Carbonara", dec!(10.00)).await;

    h.order(&r, &[(&pasta, 1)]).await.unwrap();
    h.order(&r, &[(&pasta, 3)]).await.unwrap();

    let done = h.order(&r, &[(&pasta, 2)]).await.unwrap();
    h.orders.update_status(done.id, OrderStatus::InProgress).await.unwrap();
    h.orders.update_status(done.id, OrderStatus::Done).await.unwrap();

    let cancelled = h.order(&r, &[(&pasta, 5)]).await.unwrap();
    h.orders.update_status(cancelled.id, OrderStatus::Cancelled).await.unwrap();

    let stats = h.orders.statistics(Some(r.id)).await.unwrap();
    assert_eq!(stats.total_orders, 4);
    assert_eq!(stats.pending_orders, 2);
    assert_eq!(stats.in_progress_orders, 0);
    assert_eq!(stats.done_orders, 1);
    assert_eq!(stats.cancelled_orders, 1);
    assert_eq!(stats.total_revenue.to_string(), "20.00");

    let other = h.restaurant("Osteria").await;
    let stats = h.orders.statistics(Some(other.id)).await.unwrap();
    assert_eq!(stats.total_orders, 0);
    assert_eq!(stats.total_revenue.to_string(), "0.00");

    let global = h.orders.statistics(None).await.unwrap();
    assert_eq!(global.total_orders, 4);
}

#[tokio::test]
async fn test_menu_price_change_does_not_touch_existing_orders() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let order = h.order(&r, &[(&pizza, 2)]).await.unwrap();

    h.catalog
        .update_menu_item(pizza.id, MenuItemUpdate { price: Some(dec!(18.00)), ..Default::default() })
        .await
        .unwrap();

    let reloaded = h.orders.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.items()[0].unit_price(), dec!(15.99));
    assert_eq!(reloaded.total_amount(), dec!(31.98));

    // New lines pick up the new price
    let water = h.menu_item(&r, "Water", dec!(1.50)).await;
    let fresh = h.order(&r, &[(&pizza, 1), (&water, 2)]).await.unwrap();
    assert_eq!(fresh.total_amount(), dec!(21.00));
}

#[tokio::test]
async fn test_create_order_rejections() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let other = h.restaurant("Osteria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let foreign = h.menu_item(&other, "Lasagne", dec!(12.00)).await;

    let err = h.order(&r, &[]).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::EmptyOrder)));

    let err = h.order(&r, &[(&pizza, 1), (&foreign, 1)]).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::CrossRestaurantItem { .. })));

    let err = h.order(&r, &[(&pizza, 1), (&pizza, 2)]).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::DuplicateLineItem { .. })));

    let err = h.order(&r, &[(&pizza, 0)]).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::InvalidQuantity { quantity: 0, .. })));

    let err = h.orders.create_order(NewOrder {
        restaurant_id: r.id,
        customer_name: "Ada".to_string(),
        table_number: None,
        notes: None,
        items: vec![line(Uuid::new_v4(), 1)],
    })
    .await
    .unwrap_err();
    assert!(matches!(err, OrderError::NotFound { entity: "menu item", .. }));

    h.catalog.set_restaurant_active(r.id, false).await.unwrap();
    let err = h.order(&r, &[(&pizza, 1)]).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::InactiveRestaurant { .. })));

    // Nothing was persisted along the way
    assert!(h.orders.list_orders(r.id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_item_is_rejected() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    h.catalog
        .update_menu_item(pizza.id, MenuItemUpdate { is_available: Some(false), ..Default::default() })
        .await
        .unwrap();

    let err = h.order(&r, &[(&pizza, 1)]).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::UnavailableItem { .. })));
}

#[tokio::test]
async fn test_line_item_changes_while_pending() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let water = h.menu_item(&r, "Water", dec!(1.50)).await;
    let order = h.order(&r, &[(&pizza, 2)]).await.unwrap();

    let order = h.orders.add_line_item(order.id, line(water.id, 2)).await.unwrap();
    assert_eq!(order.items().len(), 2);
    assert_eq!(order.total_amount(), dec!(34.98));

    let water_line = order.items().iter().find(|i| i.menu_item_id == water.id).unwrap().id;
    let order = h.orders.update_line_item_quantity(order.id, water_line, 4).await.unwrap();
    assert_eq!(order.total_amount(), dec!(37.98));

    let err = h.orders.add_line_item(order.id, line(pizza.id, 1)).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::DuplicateLineItem { .. })));

    let order = h.orders.remove_line_item(order.id, water_line).await.unwrap();
    assert_eq!(order.items().len(), 1);
    assert_eq!(order.total_amount(), dec!(31.98));

    let reloaded = h.orders.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.total_amount(), dec!(31.98));
    assert_eq!(reloaded.version, order.version);

    let pizza_line = reloaded.items()[0].id;
    let err = h.orders.remove_line_item(order.id, pizza_line).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::EmptyOrder)));

    let err = h.orders.remove_line_item(order.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound { entity: "order item", .. }));
}

#[tokio::test]
async fn test_line_items_locked_after_kitchen_starts() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let water = h.menu_item(&r, "Water", dec!(1.50)).await;
    let order = h.order(&r, &[(&pizza, 2)]).await.unwrap();
    h.orders.update_status(order.id, OrderStatus::InProgress).await.unwrap();

    let err = h.orders.add_line_item(order.id, line(water.id, 1)).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation(ValidationError::OrderLocked { status: OrderStatus::InProgress })
    ));

    let item_id = order.items()[0].id;
    let err = h.orders.update_line_item_quantity(order.id, item_id, 5).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::OrderLocked { .. })));

    let unchanged = h.orders.get_order(order.id).await.unwrap();
    assert_eq!(unchanged.total_amount(), dec!(31.98));
}

#[tokio::test]
async fn test_stale_write_is_a_conflict() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let order = h.order(&r, &[(&pizza, 1)]).await.unwrap();

    let mut stale = h.orders.get_order(order.id).await.unwrap();
    h.orders.update_status(order.id, OrderStatus::InProgress).await.unwrap();

    ChangeHandler::transition(&mut stale, OrderStatus::Cancelled).unwrap();
    let err: OrderError = h.store.save(&stale).await.unwrap_err().into();
    assert!(matches!(err, OrderError::Conflict { order_id } if order_id == order.id));

    let current = h.orders.get_order(order.id).await.unwrap();
    assert_eq!(current.status(), OrderStatus::InProgress);
}

#[tokio::test]
async fn test_concurrent_status_changes_have_one_winner() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let order = h.order(&r, &[(&pizza, 1)]).await.unwrap();

    let lockstep: Arc<dyn OrderRepository> = Arc::new(LockstepOrders { inner: h.store.clone(), barrier: Barrier::new(2) });
    let menu: Arc<dyn MenuCatalog> = h.store.clone();
    let manager = OrderManager::new(lockstep, menu);

    let (a, b) = tokio::join!(
        manager.update_status(order.id, OrderStatus::InProgress),
        manager.update_status(order.id, OrderStatus::InProgress),
    );

    let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, OrderError::Conflict { order_id } if order_id == order.id));

    let current = h.orders.get_order(order.id).await.unwrap();
    assert_eq!(current.status(), OrderStatus::InProgress);
    assert_eq!(current.version, 2);
}

#[tokio::test]
async fn test_menu_item_deleted_before_write_is_not_found() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let water = h.menu_item(&r, "Water", dec!(1.50)).await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let order = h.order(&r, &[(&water, 1)]).await.unwrap();

    let snapshot = h.store.get_menu_item(pizza.id).await.unwrap().unwrap();
    h.catalog.delete_menu_item(pizza.id).await.unwrap();

    let menu: Arc<dyn MenuCatalog> = Arc::new(StaleMenu { inner: h.store.clone(), stale: Mutex::new(Some(snapshot)) });
    let orders: Arc<dyn OrderRepository> = h.store.clone();
    let manager = OrderManager::new(orders, menu);

    let err = manager.add_line_item(order.id, line(pizza.id, 1)).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound { entity: "menu item", id } if id == pizza.id));

    let unchanged = h.orders.get_order(order.id).await.unwrap();
    assert_eq!(unchanged.items().len(), 1);
    assert_eq!(unchanged.total_amount(), dec!(1.50));
}

#[tokio::test]
async fn test_order_total_beyond_storage_limit_is_rejected() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let caviar = h.menu_item(&r, "Caviar", dec!(999999.99)).await;

    let err = h.order(&r, &[(&caviar, 1000)]).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation(ValidationError::InvalidQuantity { quantity: 1000, menu_item_id: Some(id) }) if id == caviar.id
    ));
    assert!(h.orders.list_orders(r.id, None).await.unwrap().is_empty());

    let order = h.order(&r, &[(&caviar, 100)]).await.unwrap();
    assert_eq!(order.total_amount(), dec!(99999999.00));
    let line_id = order.items()[0].id;
    let err = h.orders.update_line_item_quantity(order.id, line_id, 101).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(ValidationError::InvalidQuantity { quantity: 101, .. })));
    assert_eq!(h.orders.get_order(order.id).await.unwrap().total_amount(), dec!(99999999.00));
}

#[tokio::test]
async fn test_unknown_restaurant_is_reported_before_line_checks() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let missing = Uuid::new_v4();

    let err = h
        .orders
        .create_order(NewOrder {
            restaurant_id: missing,
            customer_name: "Ada".to_string(),
            table_number: None,
            notes: None,
            items: vec![line(pizza.id, 0), line(pizza.id, 0)],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotFound { entity: "restaurant", id } if id == missing));
}

#[tokio::test]
async fn test_deleting_menu_item_recomputes_order_totals() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let water = h.menu_item(&r, "Water", dec!(1.50)).await;
    let order = h.order(&r, &[(&pizza, 2), (&water, 1)]).await.unwrap();
    assert_eq!(order.total_amount(), dec!(33.48));

    h.catalog.delete_menu_item(pizza.id).await.unwrap();

    let reloaded = h.orders.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.items().len(), 1);
    assert_eq!(reloaded.total_amount(), dec!(1.50));
    assert_eq!(reloaded.version, order.version + 1);

    let err = h.catalog.delete_menu_item(pizza.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
}

#[tokio::test]
async fn test_deleting_restaurant_removes_its_orders() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let order = h.order(&r, &[(&pizza, 1)]).await.unwrap();

    h.catalog.delete_restaurant(r.id).await.unwrap();

    let err = h.orders.get_order(order.id).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound { entity: "order", .. }));
    let err = h.catalog.get_menu_item(pizza.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
    let err = h.orders.list_orders(r.id, None).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound { entity: "restaurant", .. }));
}

#[tokio::test]
async fn test_list_orders_filters_by_status() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let first = h.order(&r, &[(&pizza, 1)]).await.unwrap();
    h.order(&r, &[(&pizza, 2)]).await.unwrap();
    h.orders.update_status(first.id, OrderStatus::Cancelled).await.unwrap();

    let all = h.orders.list_orders(r.id, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let cancelled = h.orders.list_orders(r.id, Some(OrderStatus::Cancelled)).await.unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, first.id);
}

#[tokio::test]
async fn test_delete_order() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    let pizza = h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;
    let order = h.order(&r, &[(&pizza, 1)]).await.unwrap();

    h.orders.delete_order(order.id).await.unwrap();

    let err = h.orders.delete_order(order.id).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound { entity: "order", .. }));
}

#[tokio::test]
async fn test_catalog_uniqueness_conflicts() {
    let h = harness();
    let r = h.restaurant("Trattoria").await;
    h.menu_item(&r, "Margherita Pizza", dec!(15.99)).await;

    let err = h
        .catalog
        .create_restaurant(NewRestaurant { name: "Trattoria".to_string(), description: String::new() })
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let err = h
        .catalog
        .add_menu_item(
            r.id,
            NewMenuItem {
                name: "Margherita Pizza".to_string(),
                description: None,
                price: dec!(9.00),
                is_available: None,
                category: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));
}
