use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tavola_catalog::MenuItemSnapshot;
use tavola_core::money;
use uuid::Uuid;

use crate::lifecycle::OrderStatus;

/// A customer's order at one restaurant.
///
/// `total_amount` has no setter: it is re-derived by `recompute_total` from
/// the line items every time they change, and `status` only moves through
/// `ChangeHandler::transition`. It is not `Deserialize`; an order coming back
/// from outside is rebuilt with `Order::restore`.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub customer_name: String,
    pub table_number: Option<String>,
    pub(crate) status: OrderStatus,
    pub(crate) total_amount: Decimal,
    pub notes: String,
    pub(crate) items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token; 0 until first saved
    pub version: i64,
}

impl Order {
    /// A new, still empty, pending order. It only becomes valid once the
    /// first line item is added.
    pub fn new(
        restaurant_id: Uuid,
        customer_name: String,
        table_number: Option<String>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            restaurant_id,
            customer_name,
            table_number,
            status: OrderStatus::Pending,
            total_amount: money::round_currency(Decimal::ZERO),
            notes: notes.unwrap_or_default(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Rebuild an order read back from storage. The total is derived again
    /// from the items rather than trusted.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        restaurant_id: Uuid,
        customer_name: String,
        table_number: Option<String>,
        status: OrderStatus,
        notes: String,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        version: i64,
    ) -> Self {
        let mut order = Self {
            id,
            restaurant_id,
            customer_name,
            table_number,
            status,
            total_amount: Decimal::ZERO,
            notes,
            items,
            created_at,
            updated_at,
            version,
        };
        order.recompute_total();
        order
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn contains_menu_item(&self, menu_item_id: Uuid) -> bool {
        self.items.iter().any(|i| i.menu_item_id == menu_item_id)
    }

    /// Re-derive the total from the current line items
    pub fn recompute_total(&mut self) -> Decimal {
        self.total_amount = money::sum_currency(self.items.iter().map(|i| i.subtotal));
        self.total_amount
    }

    /// Drop every line referencing `menu_item_id` (catalog cascade) and
    /// recompute. Returns true when something was removed.
    pub fn purge_menu_item(&mut self, menu_item_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.menu_item_id != menu_item_id);
        if self.items.len() == before {
            return false;
        }
        self.recompute_total();
        self.touch();
        true
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One menu item within an order, priced at the moment it was added
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menu_item_id: Uuid,
    pub menu_item_name: String,
    pub(crate) quantity: i32,
    pub(crate) unit_price: Decimal,
    pub(crate) subtotal: Decimal,
    pub special_instructions: String,
}

impl OrderItem {
    /// Snapshot the catalog price into a new line
    pub(crate) fn from_snapshot(
        order_id: Uuid,
        menu_item: &MenuItemSnapshot,
        quantity: i32,
        special_instructions: Option<String>,
    ) -> Self {
        let unit_price = money::round_currency(menu_item.price);
        Self {
            id: Uuid::new_v4(),
            order_id,
            menu_item_id: menu_item.id,
            menu_item_name: menu_item.name.clone(),
            quantity,
            unit_price,
            subtotal: money::line_subtotal(unit_price, quantity),
            special_instructions: special_instructions.unwrap_or_default(),
        }
    }

    /// Rebuild a line read back from storage; the subtotal is derived again.
    pub fn restore(
        id: Uuid,
        order_id: Uuid,
        menu_item_id: Uuid,
        menu_item_name: String,
        quantity: i32,
        unit_price: Decimal,
        special_instructions: String,
    ) -> Self {
        Self {
            id,
            order_id,
            menu_item_id,
            menu_item_name,
            quantity,
            unit_price,
            subtotal: money::line_subtotal(unit_price, quantity),
            special_instructions,
        }
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub(crate) fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity;
        self.subtotal = money::line_subtotal(self.unit_price, quantity);
    }
}

/// Request to open an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub restaurant_id: Uuid,
    pub customer_name: String,
    pub table_number: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<NewLineItem>,
}

/// Request for one line item. `quantity` is wide so that negative or
/// oversized values reach validation instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    pub menu_item_id: Uuid,
    pub quantity: i64,
    pub special_instructions: Option<String>,
}
