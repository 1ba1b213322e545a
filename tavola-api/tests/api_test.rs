use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tavola_api::{app, AppState};
use tower::ServiceExt;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Restaurant with one menu item; returns (restaurant id, menu item id)
async fn seed(app: &Router, price: &str) -> (String, String) {
    let (status, restaurant) = send(
        app,
        Method::POST,
        "/v1/restaurants",
        Some(json!({ "name": "Trattoria", "description": "Wood-fired pizza" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let restaurant_id = restaurant["id"].as_str().unwrap().to_string();

    let (status, item) = send(
        app,
        Method::POST,
        &format!("/v1/restaurants/{}/menu-items", restaurant_id),
        Some(json!({ "name": "Margherita Pizza", "price": price, "category": "Pizza" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (restaurant_id, item["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_health() {
    let app = app(AppState::in_memory());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_order_flow_over_http() {
    let app = app(AppState::in_memory());
    let (restaurant_id, pizza_id) = seed(&app, "15.99").await;

    let (status, order) = send(
        &app,
        Method::POST,
        "/v1/orders",
        Some(json!({
            "restaurant_id": restaurant_id,
            "customer_name": "Ada Lovelace",
            "table_number": "4",
            "items": [{ "menu_item_id": pizza_id, "quantity": 2 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total_amount"], "31.98");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["status_display"], "Pending");
    assert_eq!(order["items"][0]["unit_price"], "15.99");
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, order) = send(
        &app,
        Method::PATCH,
        &format!("/v1/orders/{}/status", order_id),
        Some(json!({ "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status_display"], "In Progress");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/v1/orders/{}/status", order_id),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "IllegalTransition");
    assert_eq!(body["current_status"], "in_progress");
    assert_eq!(body["requested_status"], "pending");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/v1/orders/{}/status", order_id),
        Some(json!({ "status": "done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, stats) = send(
        &app,
        Method::GET,
        &format!("/v1/orders/statistics?restaurant_id={}", restaurant_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_orders"], 1);
    assert_eq!(stats["done_orders"], 1);
    assert_eq!(stats["total_revenue"], "31.98");

    let (status, orders) = send(
        &app,
        Method::GET,
        &format!("/v1/restaurants/{}/orders?status=done", restaurant_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let app = app(AppState::in_memory());
    let (restaurant_id, pizza_id) = seed(&app, "9.50").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/orders",
        Some(json!({ "restaurant_id": restaurant_id, "customer_name": "Ada", "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "EmptyOrder");

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/orders",
        Some(json!({
            "restaurant_id": restaurant_id,
            "customer_name": "Ada",
            "items": [
                { "menu_item_id": pizza_id, "quantity": 1 },
                { "menu_item_id": pizza_id, "quantity": 1 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "DuplicateLineItem");
    assert_eq!(body["menu_item_id"], pizza_id.as_str());

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/v1/restaurants/{}/orders?status=served", restaurant_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidStatus");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/v1/restaurants/{}/menu-items", restaurant_id),
        Some(json!({ "name": "Tiramisu", "price": "0.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidPrice");
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = app(AppState::in_memory());
    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/orders/5b1f6f1e-8a59-4d55-9a3c-2f0b7e1b2a10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[tokio::test]
async fn test_line_items_over_http() {
    let app = app(AppState::in_memory());
    let (restaurant_id, pizza_id) = seed(&app, "15.99").await;

    let (_, water) = send(
        &app,
        Method::POST,
        &format!("/v1/restaurants/{}/menu-items", restaurant_id),
        Some(json!({ "name": "Water", "price": "1.50", "category": "Drinks" })),
    )
    .await;
    let water_id = water["id"].as_str().unwrap().to_string();

    let (_, order) = send(
        &app,
        Method::POST,
        "/v1/orders",
        Some(json!({
            "restaurant_id": restaurant_id,
            "customer_name": "Ada",
            "items": [{ "menu_item_id": pizza_id, "quantity": 1 }]
        })),
    )
    .await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, order) = send(
        &app,
        Method::POST,
        &format!("/v1/orders/{}/items", order_id),
        Some(json!({ "menu_item_id": water_id, "quantity": 2, "special_instructions": "no ice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total_amount"], "18.99");

    let line_id = order["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["menu_item_id"] == water_id.as_str())
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, order) = send(
        &app,
        Method::PATCH,
        &format!("/v1/orders/{}/items/{}", order_id, line_id),
        Some(json!({ "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["total_amount"], "21.99");

    let (status, order) = send(
        &app,
        Method::DELETE,
        &format!("/v1/orders/{}/items/{}", order_id, line_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["total_amount"], "15.99");

    // Deleting the menu item empties the order's lines and zeroes its total
    let (status, _) = send(&app, Method::DELETE, &format!("/v1/menu-items/{}", pizza_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, order) = send(&app, Method::GET, &format!("/v1/orders/{}", order_id), None).await;
    assert_eq!(order["total_amount"], "0.00");
    assert_eq!(order["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_menu_listing_and_deactivation() {
    let app = app(AppState::in_memory());
    let (restaurant_id, pizza_id) = seed(&app, "15.99").await;

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/v1/menu-items/{}", pizza_id),
        Some(json!({ "is_available": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, menu) = send(&app, Method::GET, &format!("/v1/restaurants/{}/menu?available_only=true", restaurant_id), None).await;
    assert!(menu.as_array().unwrap().is_empty());
    let (_, menu) = send(&app, Method::GET, &format!("/v1/restaurants/{}/menu", restaurant_id), None).await;
    assert_eq!(menu.as_array().unwrap().len(), 1);

    let (status, restaurant) = send(&app, Method::POST, &format!("/v1/restaurants/{}/deactivate", restaurant_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restaurant["is_active"], false);

    let (status, _) = send(&app, Method::DELETE, &format!("/v1/restaurants/{}", restaurant_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/v1/restaurants/{}", restaurant_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
