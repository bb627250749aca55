//! Replenishment engine: supplier orders feeding the "new" bucket.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

use kitroom_core::{DomainError, ItemCode, OrderId};
use kitroom_ledger::Grade;
use kitroom_replenishment::{Order, OrderStatus, Transition};

use crate::catalog;
use crate::db::Db;
use crate::error::StoreResult;
use crate::stock;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    item_code: i64,
    quantity: i64,
    ordered_at: DateTime<Utc>,
    status: String,
    supplier: Option<String>,
    note: Option<String>,
}

impl OrderRow {
    fn into_order(self) -> StoreResult<Order> {
        Ok(Order::from_parts(
            self.id.parse::<OrderId>()?,
            ItemCode::new(self.item_code)?,
            self.quantity,
            self.ordered_at,
            self.status.parse::<OrderStatus>()?,
            self.supplier,
            self.note,
        ))
    }
}

const SELECT_ORDER: &str =
    "SELECT id, item_code, quantity, ordered_at, status, supplier, note FROM orders";

async fn find_by_id(conn: &mut SqliteConnection, id: OrderId) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDER} WHERE id = ?1"))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(OrderRow::into_order).transpose()
}

async fn update_status(conn: &mut SqliteConnection, order: &Order) -> StoreResult<()> {
    sqlx::query("UPDATE orders SET status = ?2 WHERE id = ?1")
        .bind(order.id_typed().to_string())
        .bind(order.status().as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn list_where(conn: &mut SqliteConnection, filter: &str) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> =
        sqlx::query_as(&format!("{SELECT_ORDER} {filter} ORDER BY ordered_at, id"))
            .fetch_all(&mut *conn)
            .await?;
    rows.into_iter().map(OrderRow::into_order).collect()
}

/// Result of fulfilling an order: the order plus what the fulfillment did to
/// the item's "new" bucket.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentOutcome {
    pub order: Order,
    pub added_quantity: i64,
    pub new_stock_level: i64,
}

/// Replenishment engine.
#[derive(Debug, Clone)]
pub struct ReplenishmentService {
    db: Db,
}

impl ReplenishmentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Place a supplier order for an item.
    pub async fn place(
        &self,
        item_code: ItemCode,
        quantity: i64,
        supplier: Option<String>,
        note: Option<String>,
        ordered_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Order> {
        let mut tx = self.db.begin().await?;

        if catalog::find_by_code(&mut tx, item_code).await?.is_none() {
            return Err(DomainError::not_found().into());
        }

        let order = Order::place(
            OrderId::new(),
            item_code,
            quantity,
            supplier,
            note,
            ordered_at.unwrap_or_else(Utc::now),
        )?;

        sqlx::query(
            "INSERT INTO orders (id, item_code, quantity, ordered_at, status, supplier, note) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(order.id_typed().to_string())
        .bind(order.item_code().as_i64())
        .bind(order.quantity())
        .bind(order.ordered_at())
        .bind(order.status().as_str())
        .bind(order.supplier())
        .bind(order.note())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            order = %order.id_typed(),
            item = item_code.as_i64(),
            quantity,
            "supplier order placed"
        );
        Ok(order)
    }

    /// Fulfill an order: mark it `Fulfilled` and add the ordered quantity to
    /// the item's "new" bucket, atomically.
    ///
    /// Fulfilling an already-fulfilled order is a no-op (stock is not added
    /// again); fulfilling a cancelled order is `InvalidState`.
    pub async fn fulfill(&self, id: OrderId) -> StoreResult<FulfillmentOutcome> {
        let mut tx = self.db.begin().await?;

        let mut order = find_by_id(&mut tx, id).await?.ok_or(DomainError::NotFound)?;
        match order.fulfill()? {
            Transition::AlreadyInState => {
                let level =
                    stock::bucket_quantity(&mut tx, order.item_code(), Grade::New).await?;
                Ok(FulfillmentOutcome {
                    order,
                    added_quantity: 0,
                    new_stock_level: level,
                })
            }
            Transition::Applied => {
                update_status(&mut tx, &order).await?;
                stock::release(&mut tx, order.item_code(), Grade::New, order.quantity()).await?;
                let level =
                    stock::bucket_quantity(&mut tx, order.item_code(), Grade::New).await?;
                tx.commit().await?;

                tracing::info!(
                    order = %order.id_typed(),
                    item = order.item_code().as_i64(),
                    added = order.quantity(),
                    "supplier order fulfilled"
                );
                Ok(FulfillmentOutcome {
                    added_quantity: order.quantity(),
                    new_stock_level: level,
                    order,
                })
            }
        }
    }

    /// Cancel an order. Idempotent if already cancelled; a fulfilled order
    /// cannot be cancelled. No stock effect.
    pub async fn cancel(&self, id: OrderId) -> StoreResult<Order> {
        let mut tx = self.db.begin().await?;

        let mut order = find_by_id(&mut tx, id).await?.ok_or(DomainError::NotFound)?;
        match order.cancel()? {
            Transition::AlreadyInState => Ok(order),
            Transition::Applied => {
                update_status(&mut tx, &order).await?;
                tx.commit().await?;
                tracing::info!(order = %order.id_typed(), "supplier order cancelled");
                Ok(order)
            }
        }
    }

    pub async fn get(&self, id: OrderId) -> StoreResult<Order> {
        let mut conn = self.db.acquire().await?;
        find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub async fn list(&self) -> StoreResult<Vec<Order>> {
        let mut conn = self.db.acquire().await?;
        list_where(&mut conn, "").await
    }

    /// Orders still waiting on the supplier.
    pub async fn list_pending(&self) -> StoreResult<Vec<Order>> {
        let mut conn = self.db.acquire().await?;
        list_where(&mut conn, "WHERE status = 'placed'").await
    }

    pub async fn list_for_item(&self, item_code: ItemCode) -> StoreResult<Vec<Order>> {
        let mut conn = self.db.acquire().await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE item_code = ?1 ORDER BY ordered_at, id"
        ))
        .bind(item_code.as_i64())
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }
}
