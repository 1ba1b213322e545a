use rust_decimal::Decimal;
use tavola_catalog::MenuItemSnapshot;
use tavola_core::money::{self, MAX_ORDER_TOTAL};
use uuid::Uuid;

use crate::error::{OrderError, ValidationError};
use crate::lifecycle::OrderStatus;
use crate::models::{Order, OrderItem};

/// Mutations of the order aggregate. Every line-item change ends with an
/// explicit `recompute_total`, so the total never lags behind the items.
pub struct ChangeHandler;

impl ChangeHandler {
    /// Add a line priced from the catalog snapshot
    pub fn add_line_item(
        order: &mut Order,
        menu_item: &MenuItemSnapshot,
        quantity: i64,
        special_instructions: Option<String>,
    ) -> Result<Uuid, ValidationError> {
        Self::ensure_modifiable(order)?;
        let quantity = Self::validate_quantity(Some(menu_item.id), quantity)?;

        if menu_item.restaurant_id != order.restaurant_id {
            return Err(ValidationError::CrossRestaurantItem {
                menu_item_id: menu_item.id,
                restaurant_id: order.restaurant_id,
            });
        }
        if !menu_item.is_available {
            return Err(ValidationError::UnavailableItem { menu_item_id: menu_item.id });
        }
        if order.contains_menu_item(menu_item.id) {
            return Err(ValidationError::DuplicateLineItem { menu_item_id: menu_item.id });
        }

        let item = OrderItem::from_snapshot(order.id, menu_item, quantity, special_instructions);
        Self::ensure_within_total_limit(order.total_amount, item.subtotal, menu_item.id, quantity)?;
        let item_id = item.id;
        order.items.push(item);
        order.recompute_total();
        order.touch();

        Ok(item_id)
    }

    /// Change the quantity of a line; the snapshotted unit price is kept
    pub fn update_quantity(order: &mut Order, item_id: Uuid, quantity: i64) -> Result<(), OrderError> {
        Self::ensure_modifiable(order)?;
        let current_total = order.total_amount;

        let item = order
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(OrderError::NotFound { entity: "order item", id: item_id })?;

        let quantity = Self::validate_quantity(Some(item.menu_item_id), quantity)?;
        let subtotal = money::line_subtotal(item.unit_price, quantity);
        Self::ensure_within_total_limit(current_total - item.subtotal, subtotal, item.menu_item_id, quantity)?;
        item.set_quantity(quantity);

        order.recompute_total();
        order.touch();
        Ok(())
    }

    /// Remove a line. The last line cannot be removed: an order only exists
    /// empty while it is being created.
    pub fn remove_line_item(order: &mut Order, item_id: Uuid) -> Result<OrderItem, OrderError> {
        Self::ensure_modifiable(order)?;

        let position = order
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(OrderError::NotFound { entity: "order item", id: item_id })?;

        if order.items.len() == 1 {
            return Err(ValidationError::EmptyOrder.into());
        }

        let removed = order.items.remove(position);
        order.recompute_total();
        order.touch();
        Ok(removed)
    }

    /// Apply a status change if the transition table allows it.
    /// Returns the previous status. Items and total are left untouched.
    pub fn transition(order: &mut Order, next: OrderStatus) -> Result<OrderStatus, ValidationError> {
        let current = order.status;
        if !current.can_transition_to(next) {
            return Err(ValidationError::IllegalTransition { from: current, to: next });
        }

        order.status = next;
        order.touch();
        Ok(current)
    }

    pub fn validate_quantity(menu_item_id: Option<Uuid>, quantity: i64) -> Result<i32, ValidationError> {
        match i32::try_from(quantity) {
            Ok(q) if q >= 1 => Ok(q),
            _ => Err(ValidationError::InvalidQuantity { menu_item_id, quantity }),
        }
    }

    /// A line and the order total it produces must both fit in the stored
    /// NUMERIC(10,2) columns
    fn ensure_within_total_limit(
        other_lines: Decimal,
        subtotal: Decimal,
        menu_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), ValidationError> {
        if subtotal > MAX_ORDER_TOTAL || other_lines + subtotal > MAX_ORDER_TOTAL {
            return Err(ValidationError::InvalidQuantity {
                menu_item_id: Some(menu_item_id),
                quantity: i64::from(quantity),
            });
        }
        Ok(())
    }

    fn ensure_modifiable(order: &Order) -> Result<(), ValidationError> {
        if !order.status.allows_line_item_changes() {
            return Err(ValidationError::OrderLocked { status: order.status });
        }
        Ok(())
    }
}
