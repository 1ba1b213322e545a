use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use tavola_catalog::{MenuItem, MenuItemUpdate, NewMenuItem, NewRestaurant, Restaurant};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    #[serde(default)]
    pub available_only: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/restaurants", post(create_restaurant))
        .route("/v1/restaurants/{id}", get(get_restaurant).delete(delete_restaurant))
        .route("/v1/restaurants/{id}/activate", post(activate_restaurant))
        .route("/v1/restaurants/{id}/deactivate", post(deactivate_restaurant))
        .route("/v1/restaurants/{id}/menu", get(list_menu))
        .route("/v1/restaurants/{id}/menu-items", post(add_menu_item))
        .route("/v1/menu-items/{id}", patch(update_menu_item).delete(delete_menu_item))
}

async fn create_restaurant(
    State(state): State<AppState>,
    Json(req): Json<NewRestaurant>,
) -> Result<(StatusCode, Json<Restaurant>), AppError> {
    let restaurant = state.catalog.create_restaurant(req).await?;
    Ok((StatusCode::CREATED, Json(restaurant)))
}

async fn get_restaurant(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Restaurant>, AppError> {
    Ok(Json(state.catalog.get_restaurant(id).await?))
}

/// Takes the menu and every order of the restaurant with it
async fn delete_restaurant(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.catalog.delete_restaurant(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn activate_restaurant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Restaurant>, AppError> {
    Ok(Json(state.catalog.set_restaurant_active(id, true).await?))
}

async fn deactivate_restaurant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Restaurant>, AppError> {
    Ok(Json(state.catalog.set_restaurant_active(id, false).await?))
}

async fn list_menu(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<Vec<MenuItem>>, AppError> {
    Ok(Json(state.catalog.list_menu(id, query.available_only).await?))
}

async fn add_menu_item(
    State(state): State<AppState>,
    Path(restaurant_id): Path<Uuid>,
    Json(req): Json<NewMenuItem>,
) -> Result<(StatusCode, Json<MenuItem>), AppError> {
    let item = state.catalog.add_menu_item(restaurant_id, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MenuItemUpdate>,
) -> Result<Json<MenuItem>, AppError> {
    Ok(Json(state.catalog.update_menu_item(id, req).await?))
}

/// Order lines referencing the item are dropped and their totals recomputed
async fn delete_menu_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.catalog.delete_menu_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
