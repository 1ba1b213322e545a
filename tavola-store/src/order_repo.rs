use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tavola_core::{StoreError, StoreResult};
use tavola_order::{Order, OrderItem, OrderRepository, OrderStatus, StatusTally};
use uuid::Uuid;

use crate::database::map_db_error;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    restaurant_id: Uuid,
    customer_name: String,
    table_number: Option<String>,
    status: String,
    notes: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    menu_item_id: Uuid,
    menu_item_name: String,
    quantity: i32,
    unit_price: Decimal,
    special_instructions: String,
}

#[derive(sqlx::FromRow)]
struct TallyRow {
    status: String,
    count: i64,
    total_amount: Decimal,
}

const ORDER_COLUMNS: &str =
    "id, restaurant_id, customer_name, table_number, status, notes, version, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, menu_item_id, menu_item_name, quantity, unit_price, special_instructions";

fn parse_status(raw: &str) -> StoreResult<OrderStatus> {
    raw.parse().map_err(|e: tavola_order::lifecycle::UnknownStatus| StoreError::Backend(e.to_string()))
}

fn into_order(row: OrderRow, items: Vec<OrderItemRow>) -> StoreResult<Order> {
    let items = items
        .into_iter()
        .map(|i| {
            OrderItem::restore(
                i.id,
                i.order_id,
                i.menu_item_id,
                i.menu_item_name,
                i.quantity,
                i.unit_price,
                i.special_instructions,
            )
        })
        .collect();

    Ok(Order::restore(
        row.id,
        row.restaurant_id,
        row.customer_name,
        row.table_number,
        parse_status(&row.status)?,
        row.notes,
        items,
        row.created_at,
        row.updated_at,
        row.version,
    ))
}

impl PgOrderRepository {
    async fn load_items(&self, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderItemRow>>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {} FROM order_items WHERE order_id = ANY($1) ORDER BY menu_item_name",
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
        for row in rows {
            by_order.entry(row.order_id).or_default().push(row);
        }
        Ok(by_order)
    }

    /// Write the header, insert or version-checked update
    async fn write_header(tx: &mut Transaction<'_, Postgres>, order: &Order) -> StoreResult<()> {
        if order.version == 0 {
            let inserted = sqlx::query(
                r#"
                INSERT INTO orders (id, restaurant_id, customer_name, table_number, status, total_amount, notes, version, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8, $9)
                "#,
            )
            .bind(order.id)
            .bind(order.restaurant_id)
            .bind(&order.customer_name)
            .bind(&order.table_number)
            .bind(order.status().as_str())
            .bind(order.total_amount())
            .bind(&order.notes)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error);

            return match inserted {
                Ok(_) => Ok(()),
                // Someone else saved an order with this id first
                Err(StoreError::UniqueViolation(_)) => Err(StoreError::VersionConflict {
                    entity: "order",
                    id: order.id,
                    expected: 0,
                }),
                Err(e) => Err(e),
            };
        }

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET customer_name = $3, table_number = $4, status = $5, total_amount = $6, notes = $7,
                updated_at = $8, version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(order.id)
        .bind(order.version)
        .bind(&order.customer_name)
        .bind(&order.table_number)
        .bind(order.status().as_str())
        .bind(order.total_amount())
        .bind(&order.notes)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
                .bind(order.id)
                .fetch_one(&mut **tx)
                .await
                .map_err(map_db_error)?;

            return Err(if exists {
                StoreError::VersionConflict { entity: "order", id: order.id, expected: order.version }
            } else {
                StoreError::NotFound { entity: "order", id: order.id }
            });
        }
        Ok(())
    }

    async fn upsert_items(tx: &mut Transaction<'_, Postgres>, order: &Order) -> StoreResult<()> {
        for item in order.items() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, menu_item_id, menu_item_name, quantity, unit_price, subtotal, special_instructions)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE
                SET quantity = EXCLUDED.quantity,
                    unit_price = EXCLUDED.unit_price,
                    subtotal = EXCLUDED.subtotal,
                    special_instructions = EXCLUDED.special_instructions
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.menu_item_id)
            .bind(&item.menu_item_name)
            .bind(item.quantity())
            .bind(item.unit_price())
            .bind(item.subtotal())
            .bind(&item.special_instructions)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
        }
        Ok(())
    }
}

fn saved_copy(order: &Order) -> Order {
    let mut stored = order.clone();
    stored.version += 1;
    stored
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = self.load_items(&[id]).await?.remove(&id).unwrap_or_default();
        into_order(row, items).map(Some)
    }

    async fn find_by_restaurant(&self, restaurant_id: Uuid, status: Option<OrderStatus>) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE restaurant_id = $1 AND ($2::text IS NULL OR status = $2) ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(restaurant_id)
        .bind(status.map(OrderStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                into_order(row, lines)
            })
            .collect()
    }

    async fn save(&self, order: &Order) -> StoreResult<Order> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        Self::write_header(&mut tx, order).await?;

        let keep: Vec<Uuid> = order.items().iter().map(|i| i.id).collect();
        sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND NOT (id = ANY($2))")
            .bind(order.id)
            .bind(&keep)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        Self::upsert_items(&mut tx, order).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(saved_copy(order))
    }

    async fn delete_line_item(&self, order: &Order, item_id: Uuid) -> StoreResult<Order> {
        if order.version == 0 {
            return Err(StoreError::NotFound { entity: "order", id: order.id });
        }
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        Self::write_header(&mut tx, order).await?;

        let result = sqlx::query("DELETE FROM order_items WHERE id = $1 AND order_id = $2")
            .bind(item_id)
            .bind(order.id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "order item", id: item_id });
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(saved_copy(order))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "order", id });
        }
        Ok(())
    }

    async fn status_tallies(&self, restaurant_id: Option<Uuid>) -> StoreResult<Vec<StatusTally>> {
        let rows = sqlx::query_as::<_, TallyRow>(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS total_amount
            FROM orders
            WHERE ($1::uuid IS NULL OR restaurant_id = $1)
            GROUP BY status
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(StatusTally {
                    status: parse_status(&row.status)?,
                    count: u64::try_from(row.count).unwrap_or_default(),
                    total_amount: row.total_amount,
                })
            })
            .collect()
    }
}
