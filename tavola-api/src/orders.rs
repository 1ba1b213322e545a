use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tavola_order::{NewLineItem, NewOrder, Order, OrderItem, OrderStatistics, OrderStatus};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub customer_name: String,
    pub table_number: Option<String>,
    pub status: OrderStatus,
    pub status_display: String,
    pub total_amount: Decimal,
    pub notes: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub menu_item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub special_instructions: String,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id,
            menu_item_id: item.menu_item_id,
            menu_item_name: item.menu_item_name.clone(),
            quantity: item.quantity(),
            unit_price: item.unit_price(),
            subtotal: item.subtotal(),
            special_instructions: item.special_instructions.clone(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            items: order.items().iter().map(OrderItemResponse::from).collect(),
            status: order.status(),
            status_display: order.status().label().to_string(),
            total_amount: order.total_amount(),
            id: order.id,
            restaurant_id: order.restaurant_id,
            customer_name: order.customer_name,
            table_number: order.table_number,
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.updated_at,
            version: order.version,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub restaurant_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", post(create_order))
        .route("/v1/orders/statistics", get(statistics))
        .route("/v1/orders/{id}", get(get_order).delete(delete_order))
        .route("/v1/orders/{id}/status", patch(update_status))
        .route("/v1/orders/{id}/items", post(add_line_item))
        .route(
            "/v1/orders/{id}/items/{item_id}",
            patch(update_line_item).delete(remove_line_item),
        )
        .route("/v1/restaurants/{id}/orders", get(list_restaurant_orders))
}

fn parse_status(raw: &str) -> Result<OrderStatus, AppError> {
    raw.parse().map_err(|_| AppError::invalid_status(raw))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders
async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = state.orders.create_order(req).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /v1/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.orders.get_order(order_id).await?;
    Ok(Json(order.into()))
}

/// DELETE /v1/orders/{id}
async fn delete_order(State(state): State<AppState>, Path(order_id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.orders.delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /v1/orders/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let next = parse_status(&req.status)?;
    let order = state.orders.update_status(order_id, next).await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/items
async fn add_line_item(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<NewLineItem>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = state.orders.add_line_item(order_id, req).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// PATCH /v1/orders/{id}/items/{item_id}
async fn update_line_item(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .orders
        .update_line_item_quantity(order_id, item_id, req.quantity)
        .await?;
    Ok(Json(order.into()))
}

/// DELETE /v1/orders/{id}/items/{item_id}
async fn remove_line_item(
    State(state): State<AppState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.orders.remove_line_item(order_id, item_id).await?;
    Ok(Json(order.into()))
}

/// GET /v1/restaurants/{id}/orders?status=
async fn list_restaurant_orders(
    State(state): State<AppState>,
    Path(restaurant_id): Path<Uuid>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let orders = state.orders.list_orders(restaurant_id, status).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /v1/orders/statistics?restaurant_id=
async fn statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<OrderStatistics>, AppError> {
    Ok(Json(state.orders.statistics(query.restaurant_id).await?))
}
