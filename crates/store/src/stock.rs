//! Stock ledger persistence.
//!
//! Mutating functions take the caller's open connection and never start a
//! transaction of their own: a bucket mutation must commit or roll back
//! together with the movement/order row it belongs to. The non-negativity
//! rule is evaluated against the bucket value re-read on that same
//! connection, immediately before the write (see [`crate::db::Db`] for why
//! that read cannot be stale).

use sqlx::SqliteConnection;

use kitroom_core::{DomainError, ItemCode};
use kitroom_ledger::{Grade, StockBucket, checked_decrement, checked_increment};

use crate::db::Db;
use crate::error::StoreResult;
use crate::catalog;

/// Current quantity of the (item, grade) bucket; 0 if the row does not exist.
pub async fn bucket_quantity(
    conn: &mut SqliteConnection,
    code: ItemCode,
    grade: Grade,
) -> StoreResult<i64> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT quantity FROM stock_buckets WHERE item_code = ?1 AND grade = ?2")
            .bind(code.as_i64())
            .bind(grade.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map_or(0, |r| r.0))
}

/// Remove `quantity` units from the bucket, failing with `InsufficientStock`
/// when the bucket holds less than requested.
pub async fn reserve(
    conn: &mut SqliteConnection,
    code: ItemCode,
    grade: Grade,
    quantity: i64,
) -> StoreResult<()> {
    let available = bucket_quantity(&mut *conn, code, grade).await?;
    let remaining = checked_decrement(available, quantity)?;

    // `remaining` was computed from a row that exists (an absent row reads as
    // 0 and a positive request against 0 has already failed above).
    sqlx::query("UPDATE stock_buckets SET quantity = ?3 WHERE item_code = ?1 AND grade = ?2")
        .bind(code.as_i64())
        .bind(grade.as_str())
        .bind(remaining)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Add `quantity` units to the bucket, creating the row if it does not exist.
pub async fn release(
    conn: &mut SqliteConnection,
    code: ItemCode,
    grade: Grade,
    quantity: i64,
) -> StoreResult<()> {
    let current = bucket_quantity(&mut *conn, code, grade).await?;
    let next = checked_increment(current, quantity)?;

    sqlx::query(
        "INSERT INTO stock_buckets (item_code, grade, quantity) VALUES (?1, ?2, ?3) \
         ON CONFLICT (item_code, grade) DO UPDATE SET quantity = excluded.quantity",
    )
    .bind(code.as_i64())
    .bind(grade.as_str())
    .bind(next)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Move `quantity` units between two grade buckets of the same item.
///
/// Quantities merge into the target bucket; there is never a second row for
/// the same (item, grade) pair.
pub async fn move_grade(
    conn: &mut SqliteConnection,
    code: ItemCode,
    from: Grade,
    to: Grade,
    quantity: i64,
) -> StoreResult<()> {
    if from == to {
        return Err(DomainError::validation("source and target grade are identical").into());
    }
    reserve(&mut *conn, code, from, quantity).await?;
    release(&mut *conn, code, to, quantity).await
}

/// All buckets of one item, in grade order.
pub async fn list_by_item(
    conn: &mut SqliteConnection,
    code: ItemCode,
) -> StoreResult<Vec<StockBucket>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT grade, quantity FROM stock_buckets WHERE item_code = ?1 ORDER BY grade",
    )
    .bind(code.as_i64())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|(grade, quantity)| {
            Ok(StockBucket {
                item_code: code,
                grade: grade.parse::<Grade>()?,
                quantity,
            })
        })
        .collect()
}

/// Total quantity on hand across all items and grades (reporting contract).
pub async fn sum_all(conn: &mut SqliteConnection) -> StoreResult<i64> {
    let (total,): (i64,) = sqlx::query_as("SELECT COALESCE(SUM(quantity), 0) FROM stock_buckets")
        .fetch_one(&mut *conn)
        .await?;
    Ok(total)
}

/// Read-side stock views for the HTTP layer and reporting.
#[derive(Debug, Clone)]
pub struct StockService {
    db: Db,
}

impl StockService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Quantity of one (item, grade) bucket.
    pub async fn quantity(&self, code: ItemCode, grade: Grade) -> StoreResult<i64> {
        let mut conn = self.db.acquire().await?;
        bucket_quantity(&mut conn, code, grade).await
    }

    /// All buckets of one item; fails `NotFound` for an unknown item.
    pub async fn buckets_for_item(&self, code: ItemCode) -> StoreResult<Vec<StockBucket>> {
        let mut conn = self.db.acquire().await?;
        if catalog::find_by_code(&mut conn, code).await?.is_none() {
            return Err(DomainError::not_found().into());
        }
        list_by_item(&mut conn, code).await
    }

    /// Total quantity on hand across the whole ledger.
    pub async fn total_on_hand(&self) -> StoreResult<i64> {
        let mut conn = self.db.acquire().await?;
        sum_all(&mut conn).await
    }
}
