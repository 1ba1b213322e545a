use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use tavola_catalog::CatalogError;
use tavola_order::{OrderError, ValidationError};

#[derive(Debug)]
pub enum AppError {
    /// Rejected input; `details` is merged into the response body
    Validation {
        kind: &'static str,
        message: String,
        details: Map<String, Value>,
    },
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    pub fn invalid_status(raw: &str) -> Self {
        let mut details = Map::new();
        details.insert("status".into(), json!(raw));
        AppError::Validation {
            kind: "InvalidStatus",
            message: format!("Unknown order status: {}", raw),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, error_message, details) = match self {
            AppError::Validation { kind, message, details } => (StatusCode::BAD_REQUEST, kind, message, details),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg, Map::new()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg, Map::new()),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal",
                    "Internal Server Error".to_string(),
                    Map::new(),
                )
            }
        };

        let mut body = Map::new();
        body.insert("error".into(), json!(error_message));
        body.insert("kind".into(), json!(kind));
        body.extend(details);

        (status, Json(Value::Object(body))).into_response()
    }
}

fn validation_details(err: &ValidationError) -> Map<String, Value> {
    let mut details = Map::new();
    match err {
        ValidationError::IllegalTransition { from, to } => {
            details.insert("current_status".into(), json!(from));
            details.insert("requested_status".into(), json!(to));
        }
        ValidationError::CrossRestaurantItem { menu_item_id, restaurant_id } => {
            details.insert("menu_item_id".into(), json!(menu_item_id));
            details.insert("restaurant_id".into(), json!(restaurant_id));
        }
        ValidationError::InvalidQuantity { menu_item_id, quantity } => {
            details.insert("menu_item_id".into(), json!(menu_item_id));
            details.insert("quantity".into(), json!(quantity));
        }
        ValidationError::DuplicateLineItem { menu_item_id } | ValidationError::UnavailableItem { menu_item_id } => {
            details.insert("menu_item_id".into(), json!(menu_item_id));
        }
        ValidationError::OrderLocked { status } => {
            details.insert("current_status".into(), json!(status));
        }
        ValidationError::InactiveRestaurant { restaurant_id } => {
            details.insert("restaurant_id".into(), json!(restaurant_id));
        }
        ValidationError::InvalidField { field, .. } => {
            details.insert("field".into(), json!(field));
        }
        ValidationError::EmptyOrder => {}
    }
    details
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound { .. } => AppError::NotFound(err.to_string()),
            OrderError::Validation(v) => AppError::Validation {
                kind: v.kind(),
                message: v.to_string(),
                details: validation_details(&v),
            },
            OrderError::Conflict { .. } => AppError::Conflict(err.to_string()),
            OrderError::Storage(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { .. } => AppError::NotFound(err.to_string()),
            CatalogError::Conflict(msg) => AppError::Conflict(msg),
            CatalogError::InvalidPrice(price) => {
                let mut details = Map::new();
                details.insert("price".into(), json!(price));
                AppError::Validation { kind: "InvalidPrice", message: err.to_string(), details }
            }
            CatalogError::InvalidField { field, .. } => {
                let mut details = Map::new();
                details.insert("field".into(), json!(field));
                AppError::Validation { kind: "InvalidField", message: err.to_string(), details }
            }
            CatalogError::Storage(e) => AppError::Internal(e.to_string()),
        }
    }
}
