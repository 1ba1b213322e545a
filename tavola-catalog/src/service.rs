use std::sync::Arc;

use rust_decimal::Decimal;
use tavola_core::money::{self, MAX_PRICE, MIN_PRICE};
use tavola_core::StoreError;
use tracing::info;
use uuid::Uuid;

use crate::menu::{MenuItem, MenuItemUpdate, NewMenuItem, NewRestaurant, Restaurant};
use crate::repository::CatalogRepository;

const MAX_NAME_LEN: usize = 100;
const MAX_CATEGORY_LEN: usize = 50;

/// Restaurant and menu management on top of a `CatalogRepository`
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_restaurant(&self, input: NewRestaurant) -> Result<Restaurant, CatalogError> {
        let name = input.name.trim().to_string();
        check_text("name", &name, MAX_NAME_LEN, true)?;

        let restaurant = Restaurant::new(name, input.description);
        self.repo
            .insert_restaurant(&restaurant)
            .await
            .map_err(|e| conflict_or_storage(e, format!("restaurant name '{}' already exists", restaurant.name)))?;

        info!(restaurant_id = %restaurant.id, name = %restaurant.name, "Restaurant created");
        Ok(restaurant)
    }

    pub async fn get_restaurant(&self, id: Uuid) -> Result<Restaurant, CatalogError> {
        self.repo
            .get_restaurant(id)
            .await?
            .ok_or(CatalogError::NotFound { entity: "restaurant", id })
    }

    /// Activate or deactivate; inactive restaurants are hidden from ordering
    pub async fn set_restaurant_active(&self, id: Uuid, is_active: bool) -> Result<Restaurant, CatalogError> {
        let mut restaurant = self.get_restaurant(id).await?;
        restaurant.set_active(is_active);
        self.repo.update_restaurant(&restaurant).await?;

        info!(restaurant_id = %id, is_active, "Restaurant activity changed");
        Ok(restaurant)
    }

    /// Cascades to the restaurant's menu items and orders
    pub async fn delete_restaurant(&self, id: Uuid) -> Result<(), CatalogError> {
        self.repo.delete_restaurant(id).await.map_err(not_found_or_storage)?;
        info!(restaurant_id = %id, "Restaurant deleted");
        Ok(())
    }

    pub async fn add_menu_item(&self, restaurant_id: Uuid, mut input: NewMenuItem) -> Result<MenuItem, CatalogError> {
        self.get_restaurant(restaurant_id).await?;

        input.name = input.name.trim().to_string();
        check_text("name", &input.name, MAX_NAME_LEN, true)?;
        if let Some(category) = &input.category {
            check_text("category", category, MAX_CATEGORY_LEN, false)?;
        }
        input.price = check_price(input.price)?;

        let item = MenuItem::new(restaurant_id, input);
        self.repo
            .insert_menu_item(&item)
            .await
            .map_err(|e| conflict_or_storage(e, format!("menu item '{}' already exists in this restaurant", item.name)))?;

        info!(
            restaurant_id = %restaurant_id,
            menu_item_id = %item.id,
            price = %item.price,
            "Menu item created"
        );
        Ok(item)
    }

    pub async fn get_menu_item(&self, id: Uuid) -> Result<MenuItem, CatalogError> {
        self.repo
            .find_menu_item(id)
            .await?
            .ok_or(CatalogError::NotFound { entity: "menu item", id })
    }

    /// Price changes never reach existing order lines; they hold their own snapshot.
    pub async fn update_menu_item(&self, id: Uuid, mut update: MenuItemUpdate) -> Result<MenuItem, CatalogError> {
        let mut item = self.get_menu_item(id).await?;

        if let Some(price) = update.price {
            update.price = Some(check_price(price)?);
        }
        if let Some(category) = &update.category {
            check_text("category", category, MAX_CATEGORY_LEN, false)?;
        }

        item.apply(update);
        self.repo.update_menu_item(&item).await?;

        info!(menu_item_id = %id, price = %item.price, is_available = item.is_available, "Menu item updated");
        Ok(item)
    }

    /// Cascades to order lines referencing the item
    pub async fn delete_menu_item(&self, id: Uuid) -> Result<(), CatalogError> {
        self.repo.delete_menu_item(id).await.map_err(not_found_or_storage)?;
        info!(menu_item_id = %id, "Menu item deleted");
        Ok(())
    }

    pub async fn list_menu(&self, restaurant_id: Uuid, available_only: bool) -> Result<Vec<MenuItem>, CatalogError> {
        self.get_restaurant(restaurant_id).await?;
        Ok(self.repo.list_menu_items(restaurant_id, available_only).await?)
    }
}

/// Positive, at most two fractional digits, at most eight digits overall.
/// Returned with the scale pinned to two digits.
pub fn check_price(price: Decimal) -> Result<Decimal, CatalogError> {
    if price < MIN_PRICE || price > MAX_PRICE || !money::has_currency_precision(price) {
        return Err(CatalogError::InvalidPrice(price));
    }
    Ok(money::round_currency(price))
}

fn check_text(field: &'static str, value: &str, max_len: usize, required: bool) -> Result<(), CatalogError> {
    if required && value.trim().is_empty() {
        return Err(CatalogError::InvalidField {
            field,
            reason: "must not be blank".to_string(),
        });
    }
    if value.chars().count() > max_len {
        return Err(CatalogError::InvalidField {
            field,
            reason: format!("must be at most {} characters", max_len),
        });
    }
    Ok(())
}

fn conflict_or_storage(err: StoreError, message: String) -> CatalogError {
    match err {
        StoreError::UniqueViolation(_) => CatalogError::Conflict(message),
        other => CatalogError::Storage(other),
    }
}

fn not_found_or_storage(err: StoreError) -> CatalogError {
    match err {
        StoreError::NotFound { entity, id } => CatalogError::NotFound { entity, id },
        other => CatalogError::Storage(other),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid price {0}: must be between 0.01 and 999999.99 with at most two decimal places")]
    InvalidPrice(Decimal),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    Storage(#[from] StoreError),
}
