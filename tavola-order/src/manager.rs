use std::collections::HashSet;
use std::sync::Arc;

use tavola_catalog::{MenuCatalog, MenuItemSnapshot};
use tavola_core::{Masked, StoreError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::changes::ChangeHandler;
use crate::error::{OrderError, ValidationError};
use crate::lifecycle::OrderStatus;
use crate::models::{NewLineItem, NewOrder, Order};
use crate::repository::OrderRepository;
use crate::statistics::OrderStatistics;

const MAX_CUSTOMER_NAME_LEN: usize = 100;
const MAX_TABLE_NUMBER_LEN: usize = 10;

/// Entry point for every order operation.
///
/// Each call loads the aggregate, applies one change through
/// `ChangeHandler`, and writes it back with the version it was loaded at.
/// A concurrent writer on the same order makes the save fail with
/// `OrderError::Conflict`; retrying is left to the caller.
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn MenuCatalog>,
}

impl OrderManager {
    pub fn new(orders: Arc<dyn OrderRepository>, catalog: Arc<dyn MenuCatalog>) -> Self {
        Self { orders, catalog }
    }

    /// Create a pending order with at least one line item, prices
    /// snapshotted from the catalog
    pub async fn create_order(&self, request: NewOrder) -> Result<Order, OrderError> {
        if request.items.is_empty() {
            return Err(ValidationError::EmptyOrder.into());
        }

        let customer_name = request.customer_name.trim().to_string();
        check_text("customer_name", &customer_name, MAX_CUSTOMER_NAME_LEN, true)?;
        let table_number = request
            .table_number
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if let Some(table) = &table_number {
            check_text("table_number", table, MAX_TABLE_NUMBER_LEN, false)?;
        }

        self.ensure_restaurant_open(request.restaurant_id).await?;

        let mut seen = HashSet::new();
        for line in &request.items {
            ChangeHandler::validate_quantity(Some(line.menu_item_id), line.quantity)?;
            if !seen.insert(line.menu_item_id) {
                return Err(ValidationError::DuplicateLineItem { menu_item_id: line.menu_item_id }.into());
            }
        }

        let mut order = Order::new(request.restaurant_id, customer_name, table_number, request.notes);
        for line in request.items {
            let menu_item = self.menu_item(line.menu_item_id).await?;
            ChangeHandler::add_line_item(&mut order, &menu_item, line.quantity, line.special_instructions)?;
        }

        let order = self.save(&order).await?;
        info!(
            order_id = %order.id,
            restaurant_id = %order.restaurant_id,
            customer = %Masked(&order.customer_name),
            items = order.items().len(),
            total_amount = %order.total_amount(),
            "Order created"
        );
        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::order_not_found(order_id))
    }

    pub async fn list_orders(
        &self,
        restaurant_id: Uuid,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        self.catalog
            .get_restaurant(restaurant_id)
            .await?
            .ok_or(OrderError::NotFound { entity: "restaurant", id: restaurant_id })?;

        Ok(self.orders.find_by_restaurant(restaurant_id, status).await?)
    }

    /// Move the order along the lifecycle. Only the status changes.
    pub async fn update_status(&self, order_id: Uuid, next: OrderStatus) -> Result<Order, OrderError> {
        let mut order = self.get_order(order_id).await?;

        let previous = match ChangeHandler::transition(&mut order, next) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(order_id = %order_id, from = %order.status(), to = %next, "Rejected status change");
                return Err(e.into());
            }
        };

        let order = self.save(&order).await?;
        info!(order_id = %order_id, from = %previous, to = %next, "Order status changed");
        Ok(order)
    }

    pub async fn add_line_item(&self, order_id: Uuid, line: NewLineItem) -> Result<Order, OrderError> {
        let mut order = self.get_order(order_id).await?;
        if !order.status().allows_line_item_changes() {
            return Err(ValidationError::OrderLocked { status: order.status() }.into());
        }
        ChangeHandler::validate_quantity(Some(line.menu_item_id), line.quantity)?;

        self.ensure_restaurant_open(order.restaurant_id).await?;
        let menu_item = self.menu_item(line.menu_item_id).await?;
        let item_id = ChangeHandler::add_line_item(&mut order, &menu_item, line.quantity, line.special_instructions)?;

        let order = self.save(&order).await?;
        info!(
            order_id = %order_id,
            item_id = %item_id,
            menu_item_id = %line.menu_item_id,
            total_amount = %order.total_amount(),
            "Line item added"
        );
        Ok(order)
    }

    pub async fn update_line_item_quantity(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        quantity: i64,
    ) -> Result<Order, OrderError> {
        let mut order = self.get_order(order_id).await?;
        ChangeHandler::update_quantity(&mut order, item_id, quantity)?;

        let order = self.save(&order).await?;
        info!(
            order_id = %order_id,
            item_id = %item_id,
            quantity,
            total_amount = %order.total_amount(),
            "Line item quantity changed"
        );
        Ok(order)
    }

    pub async fn remove_line_item(&self, order_id: Uuid, item_id: Uuid) -> Result<Order, OrderError> {
        let mut order = self.get_order(order_id).await?;
        ChangeHandler::remove_line_item(&mut order, item_id)?;

        let order = self
            .orders
            .delete_line_item(&order, item_id)
            .await
            .map_err(|e| self.log_conflict(order_id, e.into()))?;
        info!(order_id = %order_id, item_id = %item_id, total_amount = %order.total_amount(), "Line item removed");
        Ok(order)
    }

    /// Removes the order and, by cascade, its line items
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), OrderError> {
        self.orders.delete(order_id).await?;
        info!(order_id = %order_id, "Order deleted");
        Ok(())
    }

    pub async fn statistics(&self, restaurant_id: Option<Uuid>) -> Result<OrderStatistics, OrderError> {
        let tallies = self.orders.status_tallies(restaurant_id).await?;
        Ok(OrderStatistics::from_tallies(&tallies))
    }

    async fn save(&self, order: &Order) -> Result<Order, OrderError> {
        match self.orders.save(order).await {
            Ok(saved) => Ok(saved),
            Err(StoreError::ForeignKeyViolation(constraint)) => Err(self.missing_reference(order, constraint).await),
            Err(e) => Err(self.log_conflict(order.id, e.into())),
        }
    }

    /// Name the restaurant or menu item that disappeared between validation
    /// and the write
    async fn missing_reference(&self, order: &Order, constraint: String) -> OrderError {
        warn!(order_id = %order.id, constraint = %constraint, "Order references a deleted catalog entry");
        if constraint.contains("restaurant_id") {
            return OrderError::NotFound { entity: "restaurant", id: order.restaurant_id };
        }
        for item in order.items() {
            if let Ok(None) = self.catalog.get_menu_item(item.menu_item_id).await {
                return OrderError::NotFound { entity: "menu item", id: item.menu_item_id };
            }
        }
        OrderError::Storage(StoreError::ForeignKeyViolation(constraint))
    }

    fn log_conflict(&self, order_id: Uuid, err: OrderError) -> OrderError {
        if let OrderError::Conflict { .. } = err {
            warn!(order_id = %order_id, "Concurrent modification detected");
        }
        err
    }

    async fn ensure_restaurant_open(&self, restaurant_id: Uuid) -> Result<(), OrderError> {
        let restaurant = self
            .catalog
            .get_restaurant(restaurant_id)
            .await?
            .ok_or(OrderError::NotFound { entity: "restaurant", id: restaurant_id })?;

        if !restaurant.is_active {
            return Err(ValidationError::InactiveRestaurant { restaurant_id }.into());
        }
        Ok(())
    }

    async fn menu_item(&self, menu_item_id: Uuid) -> Result<MenuItemSnapshot, OrderError> {
        self.catalog
            .get_menu_item(menu_item_id)
            .await?
            .ok_or(OrderError::NotFound { entity: "menu item", id: menu_item_id })
    }
}

fn check_text(field: &'static str, value: &str, max_len: usize, required: bool) -> Result<(), ValidationError> {
    if required && value.is_empty() {
        return Err(ValidationError::InvalidField {
            field,
            reason: "must not be blank".to_string(),
        });
    }
    if value.chars().count() > max_len {
        return Err(ValidationError::InvalidField {
            field,
            reason: format!("must be at most {} characters", max_len),
        });
    }
    Ok(())
}
