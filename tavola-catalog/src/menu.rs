use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A restaurant exposing a menu
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Restaurant {
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deactivated restaurants stay in the catalog but cannot take orders
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
        self.updated_at = Utc::now();
    }
}

/// A dish or drink owned by exactly one restaurant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub is_available: bool,
    /// Free label such as "Main", "Dessert", "Drink"
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    pub fn new(restaurant_id: Uuid, input: NewMenuItem) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            restaurant_id,
            name: input.name,
            description: input.description.unwrap_or_default(),
            price: input.price,
            is_available: input.is_available.unwrap_or(true),
            category: input.category.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The read-only view the order side consumes
    pub fn snapshot(&self) -> MenuItemSnapshot {
        MenuItemSnapshot {
            id: self.id,
            restaurant_id: self.restaurant_id,
            name: self.name.clone(),
            price: self.price,
            is_available: self.is_available,
        }
    }

    pub fn apply(&mut self, update: MenuItemUpdate) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(is_available) = update.is_available {
            self.is_available = is_available;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        self.updated_at = Utc::now();
    }
}

/// Current price and availability of a menu item, as seen by the order aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItemSnapshot {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRestaurant {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub is_available: Option<bool>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemUpdate {
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub is_available: Option<bool>,
    pub category: Option<String>,
}
