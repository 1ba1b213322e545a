use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tavola_core::StoreResult;
use uuid::Uuid;

use crate::lifecycle::OrderStatus;
use crate::models::Order;

/// Storage for order aggregates.
///
/// Writes are version-checked: `order.version` must equal the stored version
/// (0 for an order never saved), otherwise `StoreError::VersionConflict` is
/// returned and nothing is written. The stored copy is returned with its
/// version incremented. Header and line items are written in one transaction.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// Newest first
    async fn find_by_restaurant(
        &self,
        restaurant_id: Uuid,
        status: Option<OrderStatus>,
    ) -> StoreResult<Vec<Order>>;

    /// Insert or update the order together with its full set of line items
    async fn save(&self, order: &Order) -> StoreResult<Order>;

    /// Delete one line row and write the (already recomputed) header of
    /// `order` in the same transaction
    async fn delete_line_item(&self, order: &Order, item_id: Uuid) -> StoreResult<Order>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Order count and summed totals per status, optionally for one restaurant
    async fn status_tallies(&self, restaurant_id: Option<Uuid>) -> StoreResult<Vec<StatusTally>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTally {
    pub status: OrderStatus,
    pub count: u64,
    pub total_amount: Decimal,
}
