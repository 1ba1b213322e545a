use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tavola_catalog::{CatalogRepository, MenuCatalog, MenuItem, MenuItemSnapshot, Restaurant};
use tavola_core::{StoreError, StoreResult};
use tracing::debug;
use uuid::Uuid;

use crate::database::map_db_error;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RestaurantRow {
    id: Uuid,
    name: String,
    description: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Restaurant {
            id: row.id,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: Uuid,
    restaurant_id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    is_available: bool,
    category: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        MenuItem {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            description: row.description,
            price: row.price,
            is_available: row.is_available,
            category: row.category,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const RESTAURANT_COLUMNS: &str = "id, name, description, is_active, created_at, updated_at";
const MENU_ITEM_COLUMNS: &str =
    "id, restaurant_id, name, description, price, is_available, category, created_at, updated_at";

#[async_trait]
impl MenuCatalog for PgCatalogRepository {
    async fn get_menu_item(&self, id: Uuid) -> StoreResult<Option<MenuItemSnapshot>> {
        Ok(self.find_menu_item(id).await?.map(|item| item.snapshot()))
    }

    async fn get_restaurant(&self, id: Uuid) -> StoreResult<Option<Restaurant>> {
        let row = sqlx::query_as::<_, RestaurantRow>(&format!(
            "SELECT {} FROM restaurants WHERE id = $1",
            RESTAURANT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(Restaurant::from))
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn insert_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO restaurants (id, name, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(restaurant.id)
        .bind(&restaurant.name)
        .bind(&restaurant.description)
        .bind(restaurant.is_active)
        .bind(restaurant.created_at)
        .bind(restaurant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn update_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE restaurants SET name = $2, description = $3, is_active = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(restaurant.id)
        .bind(&restaurant.name)
        .bind(&restaurant.description)
        .bind(restaurant.is_active)
        .bind(restaurant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "restaurant", id: restaurant.id });
        }
        Ok(())
    }

    async fn delete_restaurant(&self, id: Uuid) -> StoreResult<()> {
        // menu_items, orders and order_items go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM restaurants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "restaurant", id });
        }
        Ok(())
    }

    async fn insert_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO menu_items (id, restaurant_id, name, description, price, is_available, category, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item.id)
        .bind(item.restaurant_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.is_available)
        .bind(&item.category)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn find_menu_item(&self, id: Uuid) -> StoreResult<Option<MenuItem>> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {} FROM menu_items WHERE id = $1",
            MENU_ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(MenuItem::from))
    }

    async fn update_menu_item(&self, item: &MenuItem) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE menu_items
            SET name = $2, description = $3, price = $4, is_available = $5, category = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.is_available)
        .bind(&item.category)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "menu item", id: item.id });
        }
        Ok(())
    }

    async fn delete_menu_item(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let affected_orders: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT order_id FROM order_items WHERE menu_item_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(map_db_error)?;

        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "menu item", id });
        }

        // The cascade removed the order lines; bring the owning totals back in line
        sqlx::query(
            r#"
            UPDATE orders o
            SET total_amount = COALESCE((SELECT SUM(subtotal) FROM order_items WHERE order_id = o.id), 0),
                version = version + 1,
                updated_at = NOW()
            WHERE o.id = ANY($1)
            "#,
        )
        .bind(&affected_orders)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        debug!(menu_item_id = %id, orders = affected_orders.len(), "Cascaded menu item delete to orders");
        Ok(())
    }

    async fn list_menu_items(&self, restaurant_id: Uuid, available_only: bool) -> StoreResult<Vec<MenuItem>> {
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {} FROM menu_items WHERE restaurant_id = $1 AND ($2 = FALSE OR is_available) ORDER BY category, name",
            MENU_ITEM_COLUMNS
        ))
        .bind(restaurant_id)
        .bind(available_only)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(MenuItem::from).collect())
    }
}
