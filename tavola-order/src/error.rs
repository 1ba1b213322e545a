use tavola_core::StoreError;
use uuid::Uuid;

use crate::lifecycle::OrderStatus;

/// Caller-correctable problems, always detected before anything is persisted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Menu item {menu_item_id} does not belong to restaurant {restaurant_id}")]
    CrossRestaurantItem { menu_item_id: Uuid, restaurant_id: Uuid },

    #[error("Invalid quantity {quantity}: must be at least 1 and keep the order total within 99999999.99")]
    InvalidQuantity { menu_item_id: Option<Uuid>, quantity: i64 },

    #[error("Menu item {menu_item_id} appears more than once in the order")]
    DuplicateLineItem { menu_item_id: Uuid },

    #[error("Cannot change status from '{from}' to '{to}'")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Line items cannot change once the order is '{status}'")]
    OrderLocked { status: OrderStatus },

    #[error("Restaurant {restaurant_id} is not accepting orders")]
    InactiveRestaurant { restaurant_id: Uuid },

    #[error("Menu item {menu_item_id} is currently unavailable")]
    UnavailableItem { menu_item_id: Uuid },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    /// Stable identifier surfaced to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::EmptyOrder => "EmptyOrder",
            ValidationError::CrossRestaurantItem { .. } => "CrossRestaurantItem",
            ValidationError::InvalidQuantity { .. } => "InvalidQuantity",
            ValidationError::DuplicateLineItem { .. } => "DuplicateLineItem",
            ValidationError::IllegalTransition { .. } => "IllegalTransition",
            ValidationError::OrderLocked { .. } => "OrderLocked",
            ValidationError::InactiveRestaurant { .. } => "InactiveRestaurant",
            ValidationError::UnavailableItem { .. } => "UnavailableItem",
            ValidationError::InvalidField { .. } => "InvalidField",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Order {order_id} was modified concurrently; reload and retry")]
    Conflict { order_id: Uuid },

    #[error(transparent)]
    Storage(StoreError),
}

impl OrderError {
    pub fn order_not_found(id: Uuid) -> Self {
        OrderError::NotFound { entity: "order", id }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => OrderError::NotFound { entity, id },
            StoreError::VersionConflict { id, .. } => OrderError::Conflict { order_id: id },
            other => OrderError::Storage(other),
        }
    }
}
